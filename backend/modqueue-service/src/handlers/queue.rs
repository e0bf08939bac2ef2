/// Live moderation listings, proxied straight from Reddit.
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::config::MAX_FETCH_LIMIT;
use crate::error::Result;
use crate::services::QueueSourceTrait;

use super::success;

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub subreddit: Option<String>,
    pub limit: Option<u32>,
}

impl ListingQuery {
    /// Requested subreddit, falling back to `mod` (all moderated subreddits).
    fn scope(&self) -> &str {
        match self.subreddit.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "mod",
        }
    }

    fn limit(&self) -> u32 {
        self.limit.unwrap_or(MAX_FETCH_LIMIT).min(MAX_FETCH_LIMIT)
    }
}

/// GET /api/moderator/me
pub async fn moderator_info(
    source: web::Data<Arc<dyn QueueSourceTrait>>,
) -> Result<HttpResponse> {
    let info = source.moderator_info().await?;
    Ok(success(info))
}

/// GET /api/mod/unmoderated
pub async fn unmoderated(
    source: web::Data<Arc<dyn QueueSourceTrait>>,
    query: web::Query<ListingQuery>,
) -> Result<HttpResponse> {
    let posts = source
        .fetch_unmoderated(query.scope(), query.limit())
        .await?;

    let count = posts.len();
    Ok(success(serde_json::json!({
        "subreddit": query.scope(),
        "posts": posts,
        "count": count,
    })))
}

/// GET /api/mod/modqueue
///
/// Same shape as the unmoderated listing; records additionally carry the
/// display-only report fields.
pub async fn modqueue(
    source: web::Data<Arc<dyn QueueSourceTrait>>,
    query: web::Query<ListingQuery>,
) -> Result<HttpResponse> {
    let posts = source.fetch_modqueue(query.scope(), query.limit()).await?;

    let count = posts.len();
    Ok(success(serde_json::json!({
        "subreddit": query.scope(),
        "posts": posts,
        "count": count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_subreddit_falls_back_to_the_aggregate_scope() {
        let query = ListingQuery {
            subreddit: Some(String::new()),
            limit: None,
        };
        assert_eq!(query.scope(), "mod");

        let query = ListingQuery {
            subreddit: Some("rust".to_string()),
            limit: None,
        };
        assert_eq!(query.scope(), "rust");
    }

    #[test]
    fn listing_limit_is_capped() {
        let query = ListingQuery {
            subreddit: None,
            limit: Some(500),
        };
        assert_eq!(query.limit(), MAX_FETCH_LIMIT);

        let query = ListingQuery {
            subreddit: None,
            limit: Some(25),
        };
        assert_eq!(query.limit(), 25);
    }
}
