/// Error types for modqueue-service
///
/// Record-scoped errors (`Validation`, `Conflict`, `Database`) are caught by
/// the batch reconciler so one bad record never aborts a batch. Cycle-scoped
/// errors (`UpstreamAuth`, `UpstreamConnectivity`, `UpstreamApi`) abort the
/// current sync cycle and are retried on the next tick.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Result type for modqueue-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: missing or invalid field '{0}'")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream authentication failed: {0}")]
    UpstreamAuth(String),

    #[error("Upstream request failed with status {status}: {message}")]
    UpstreamApi { status: u16, message: String },

    #[error("Upstream unreachable: {0}")]
    UpstreamConnectivity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UpstreamAuth(_) => StatusCode::UNAUTHORIZED,
            AppError::UpstreamApi { .. } => StatusCode::BAD_GATEWAY,
            AppError::UpstreamConnectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Internal details (database messages, config state) stay in logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            AppError::UpstreamConnectivity(err.to_string())
        } else if let Some(status) = err.status() {
            AppError::UpstreamApi {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            // DNS failures, TLS errors and aborted transfers land here.
            AppError::UpstreamConnectivity(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(
            AppError::Validation("author".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UpstreamAuth("rejected".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Conflict("duplicate permalink".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::UpstreamConnectivity("timed out".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::NotFound("post 'x'".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn validation_error_names_the_field() {
        let err = AppError::Validation("created_utc".into());
        assert!(err.to_string().contains("created_utc"));
    }

    #[actix_web::test]
    async fn internal_error_bodies_are_generic() {
        let resp = AppError::Database(sqlx::Error::PoolTimedOut).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Internal server error"));
        assert!(!text.contains("pool timed out"));
    }
}
