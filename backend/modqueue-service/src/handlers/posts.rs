/// Read views over the reconciled post store.
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::ModerationStatus;
use crate::repository::PostRepositoryTrait;

use super::success;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub subreddit: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    pub status: Option<String>,
}

/// GET /api/posts
///
/// Stored posts filtered by moderation status (default `unmoderated`) and
/// optionally by subreddit, newest first.
pub async fn list_posts(
    repository: web::Data<Arc<dyn PostRepositoryTrait>>,
    query: web::Query<PostsQuery>,
) -> Result<HttpResponse> {
    let status = match query.status.as_deref() {
        Some(value) => value.parse::<ModerationStatus>()?,
        None => ModerationStatus::default(),
    };
    let subreddit = query.subreddit.as_deref().filter(|name| !name.is_empty());

    let posts = repository
        .get_by_status(subreddit, status.as_str(), query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;

    let count = posts.len();
    Ok(success(serde_json::json!({
        "posts": posts,
        "count": count,
    })))
}

/// GET /api/posts/latest
pub async fn latest_posts(
    repository: web::Data<Arc<dyn PostRepositoryTrait>>,
    query: web::Query<LatestQuery>,
) -> Result<HttpResponse> {
    let posts = repository.latest(query.limit.unwrap_or(DEFAULT_LIMIT)).await?;

    let count = posts.len();
    Ok(success(serde_json::json!({
        "posts": posts,
        "count": count,
    })))
}

/// GET /api/posts/count
pub async fn count_posts(
    repository: web::Data<Arc<dyn PostRepositoryTrait>>,
    query: web::Query<CountQuery>,
) -> Result<HttpResponse> {
    let status = match query.status.as_deref() {
        Some(value) => Some(value.parse::<ModerationStatus>()?),
        None => None,
    };

    let count = repository.count(status.map(|s| s.as_str())).await?;
    Ok(success(serde_json::json!({ "count": count })))
}

/// GET /api/posts/summary
pub async fn subreddit_summary(
    repository: web::Data<Arc<dyn PostRepositoryTrait>>,
) -> Result<HttpResponse> {
    let mut summary = repository.summary_by_subreddit().await?;

    // Busiest subreddits first; name breaks ties for a stable ordering.
    summary.sort_by(|a, b| {
        b.post_count
            .cmp(&a.post_count)
            .then_with(|| a.subreddit.cmp(&b.subreddit))
    });

    Ok(success(summary))
}

/// GET /api/posts/{id}
pub async fn get_post(
    repository: web::Data<Arc<dyn PostRepositoryTrait>>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    match repository.get_by_id(&id).await? {
        Some(post) => Ok(success(post)),
        None => Err(AppError::NotFound(format!("post '{}'", id))),
    }
}
