/// Configuration management for modqueue-service
///
/// Everything is loaded from environment variables. Reddit credentials are
/// required; the rest have development defaults.
use std::fmt;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Hard cap on posts fetched per cycle, matching the upstream listing limit.
pub const MAX_FETCH_LIMIT: u32 = 100;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Reddit API credentials
    pub reddit: RedditConfig,
    /// Background sync settings
    pub sync: SyncConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Script-app OAuth credentials for the Reddit API.
#[derive(Clone)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

// Keep the secret and password out of logs.
impl fmt::Debug for RedditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("username", &self.username)
            .field("password", &"***")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Seconds between scheduled sync cycles
    pub interval_secs: u64,
    /// Posts fetched per cycle, capped at [`MAX_FETCH_LIMIT`]
    pub fetch_limit: u32,
    /// Listing scope: a subreddit name, or "mod" for all moderated subreddits
    pub scope: String,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            database: DatabaseConfig {
                url: require_var("DATABASE_URL")?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            reddit: RedditConfig {
                client_id: require_var("REDDIT_CLIENT_ID")?,
                client_secret: require_var("REDDIT_CLIENT_SECRET")?,
                username: require_var("REDDIT_USERNAME")?,
                password: require_var("REDDIT_PASSWORD")?,
                user_agent: require_var("REDDIT_USER_AGENT")?,
            },
            sync: SyncConfig {
                interval_secs: std::env::var("SYNC_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
                fetch_limit: std::env::var("SYNC_FETCH_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(MAX_FETCH_LIMIT)
                    .min(MAX_FETCH_LIMIT),
                scope: std::env::var("SYNC_SCOPE").unwrap_or_else(|_| "mod".to_string()),
            },
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Config(format!("{} must be set", name))),
    }
}
