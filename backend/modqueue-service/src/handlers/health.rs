/// Health check endpoint.
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

/// GET /health: liveness plus a database round-trip.
pub async fn health_check(pool: web::Data<PgPool>) -> HttpResponse {
    match sqlx::query("SELECT 1").fetch_one(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "modqueue-service",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Err(err) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("database connection failed: {}", err),
            "service": "modqueue-service",
        })),
    }
}
