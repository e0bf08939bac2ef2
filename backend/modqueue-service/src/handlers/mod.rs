/// HTTP handlers for the moderation queue API
///
/// - `queue`: live Reddit listings, proxied without persistence
/// - `posts`: read views over the reconciled store
/// - `sync`: on-demand sync cycles and scheduler status
/// - `health`: liveness plus a database round-trip
pub mod health;
pub mod posts;
pub mod queue;
pub mod sync;

pub use health::health_check;
pub use posts::{count_posts, get_post, latest_posts, list_posts, subreddit_summary};
pub use queue::{modqueue, moderator_info, unmoderated};
pub use sync::{sync_status, trigger_sync};

use actix_web::{web, HttpResponse};
use serde::Serialize;

/// Register every API route on the server.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .route("/moderator/me", web::get().to(queue::moderator_info))
                .route("/mod/unmoderated", web::get().to(queue::unmoderated))
                .route("/mod/modqueue", web::get().to(queue::modqueue))
                .service(
                    web::scope("/posts")
                        .route("", web::get().to(posts::list_posts))
                        .route("/latest", web::get().to(posts::latest_posts))
                        .route("/count", web::get().to(posts::count_posts))
                        .route("/summary", web::get().to(posts::subreddit_summary))
                        .route("/{id}", web::get().to(posts::get_post)),
                )
                .route("/sync", web::post().to(sync::trigger_sync))
                .route("/sync/status", web::get().to(sync::sync_status)),
        );
}

/// The `{ "status": "success", "data": ... }` envelope every successful
/// response uses.
pub(crate) fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "data": data,
    }))
}
