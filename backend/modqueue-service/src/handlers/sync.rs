/// On-demand sync cycles and scheduler visibility.
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::config::{SyncConfig, MAX_FETCH_LIMIT};
use crate::error::Result;
use crate::jobs::{SyncRunner, SyncStatusHandle};

use super::success;

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    pub subreddit: Option<String>,
    pub limit: Option<u32>,
}

/// POST /api/sync
///
/// Runs one fetch-and-reconcile cycle immediately, defaulting to the
/// configured scope and limit. May interleave with a scheduled cycle; each
/// upsert is its own transaction, so the last commit for a given post wins.
pub async fn trigger_sync(
    runner: web::Data<SyncRunner>,
    config: web::Data<SyncConfig>,
    body: Option<web::Json<SyncRequest>>,
) -> Result<HttpResponse> {
    let request = body.map(web::Json::into_inner).unwrap_or_default();

    let scope = request
        .subreddit
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| config.scope.clone());
    let limit = request
        .limit
        .unwrap_or(config.fetch_limit)
        .min(MAX_FETCH_LIMIT);

    let outcome = runner.run_cycle(&scope, limit).await?;

    Ok(success(serde_json::json!({
        "scope": scope,
        "attempted": outcome.attempted,
        "succeeded": outcome.succeeded,
    })))
}

/// GET /api/sync/status
pub async fn sync_status(status: web::Data<SyncStatusHandle>) -> Result<HttpResponse> {
    Ok(success(status.snapshot().await))
}
