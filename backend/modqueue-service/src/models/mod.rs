/// Data types for the moderation queue pipeline.
///
/// Three shapes of the same post, one per pipeline stage:
/// - [`RawPost`]: what the upstream listing returns, deliberately lenient
/// - [`NormalizedPost`]: fully materialized, validated, ready to persist
/// - [`RedditPost`]: a stored row including server-managed columns
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One record as fetched from the upstream moderation listing.
///
/// Every field is optional or defaulted; validation happens in the
/// normalizer, not during deserialization, so a single odd record cannot
/// fail the whole listing parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_utc: Option<RawTimestamp>,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub num_comments: i32,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub upvote_ratio: f64,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub spoiler: bool,
    #[serde(default)]
    pub link_flair_text: Option<String>,

    // Modqueue-only report data. Passed through to API consumers for
    // display; never persisted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mod_reports: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_reports: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_reasons: Option<Vec<String>>,
}

/// Upstream creation timestamp, either epoch seconds or an ISO-8601 string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(f64),
    Text(String),
}

/// Output of the normalizer: every field concrete, timestamps parsed.
///
/// This is the only type the repository accepts for writes, so nothing
/// half-validated can reach the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPost {
    pub id: String,
    pub permalink: String,
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub created_utc: DateTime<Utc>,
    pub selftext: Option<String>,
    pub url: String,
    pub score: i32,
    pub num_comments: i32,
    pub upvote_ratio: f64,
    pub is_self: bool,
    pub is_video: bool,
    pub stickied: bool,
    pub over_18: bool,
    pub spoiler: bool,
    pub link_flair_text: Option<String>,
}

/// A stored post row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RedditPost {
    pub id: String,
    pub permalink: String,
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub created_utc: DateTime<Utc>,
    pub selftext: Option<String>,
    pub url: String,
    pub score: i32,
    pub num_comments: i32,
    pub upvote_ratio: f64,
    pub is_self: bool,
    pub is_video: bool,
    pub stickied: bool,
    pub over_18: bool,
    pub spoiler: bool,
    pub link_flair_text: Option<String>,
    pub moderation_status: String,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Per-subreddit post count for the summary view.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubredditCount {
    pub subreddit: String,
    pub post_count: i64,
}

/// Moderation state of a stored post.
///
/// The sync pipeline only ever writes the default; the other variants are
/// written by moderation tooling and accepted here for query filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Unmoderated,
    Approved,
    Removed,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Unmoderated => "unmoderated",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unmoderated" => Ok(ModerationStatus::Unmoderated),
            "approved" => Ok(ModerationStatus::Approved),
            "removed" => Ok(ModerationStatus::Removed),
            other => Err(AppError::BadRequest(format!(
                "unknown moderation status '{}'",
                other
            ))),
        }
    }
}
