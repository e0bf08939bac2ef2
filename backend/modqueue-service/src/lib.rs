/// Moderation Queue Service Library
///
/// Periodically pulls moderation-queue listings from Reddit and reconciles
/// them into PostgreSQL, so moderation tooling can inspect the backlog
/// without hitting the Reddit API on every request.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers
/// - `models`: raw, normalized and stored post types
/// - `services`: Reddit client, record normalizer, batch reconciler
/// - `repository`: persistent store for reconciled posts
/// - `jobs`: scheduled background sync
/// - `db`: connection pool and migrations
/// - `error`: error types and HTTP mapping
/// - `config`: environment configuration
/// - `metrics`: Prometheus metrics
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
