/// Raw record validation and materialization.
///
/// Pure functions; no IO. The reconciler only persists what comes out of
/// [`normalize`], so partially-valid upstream records can never reach the
/// repository.
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{NormalizedPost, RawPost, RawTimestamp};

/// Placeholder the upstream platform shows for deleted accounts. The
/// Reddit client substitutes this for null authors, so a record arriving
/// here without an author is malformed rather than merely deleted.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// Validate a raw record and materialize it into a [`NormalizedPost`].
///
/// `id`, `title`, `author` and `subreddit` must be present and non-empty;
/// `created_utc` must parse. Everything else falls back to its default.
pub fn normalize(raw: &RawPost) -> Result<NormalizedPost> {
    let id = required(&raw.id, "id")?;
    let title = required(&raw.title, "title")?;
    let author = required(raw.author.as_deref().unwrap_or(""), "author")?;
    let subreddit = required(&raw.subreddit, "subreddit")?;

    let created_utc = match &raw.created_utc {
        Some(ts) => parse_timestamp(ts)?,
        None => return Err(AppError::Validation("created_utc".to_string())),
    };

    Ok(NormalizedPost {
        id,
        permalink: raw.permalink.trim().to_string(),
        title,
        author,
        subreddit,
        created_utc,
        selftext: raw.selftext.clone(),
        url: raw.url.clone(),
        score: raw.score,
        num_comments: raw.num_comments,
        upvote_ratio: raw.upvote_ratio,
        is_self: raw.is_self,
        is_video: raw.is_video,
        stickied: raw.stickied,
        over_18: raw.over_18,
        spoiler: raw.spoiler,
        link_flair_text: raw.link_flair_text.clone(),
    })
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(field.to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_timestamp(ts: &RawTimestamp) -> Result<DateTime<Utc>> {
    match ts {
        RawTimestamp::Epoch(secs) => parse_epoch(*secs),
        RawTimestamp::Text(text) => parse_iso(text),
    }
}

fn parse_epoch(secs: f64) -> Result<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(AppError::Validation("created_utc".to_string()));
    }

    let whole = secs.trunc() as i64;
    let nanos = (secs.fract() * 1e9) as u32;
    DateTime::from_timestamp(whole, nanos)
        .ok_or_else(|| AppError::Validation("created_utc".to_string()))
}

fn parse_iso(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Offset-free timestamps are taken as UTC.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(AppError::Validation("created_utc".to_string()))
}
