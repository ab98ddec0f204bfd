//! API error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors a request can fail with at the gateway boundary.
///
/// Each variant maps to one status code; the body is always a JSON object
/// with `status` and `error` fields so clients parse failures uniformly.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or wrong auth token.
    #[error("invalid or missing auth token")]
    Unauthorized,

    /// The client's token bucket is empty.
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The command matched a security deny pattern.
    #[error("command blocked by security policy ({pattern})")]
    SecurityBlocked { pattern: &'static str },

    /// The request body is not usable.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Anything unexpected below the routing layer.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::SecurityBlocked { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal detail stays in the logs, not the body.
        let message = match &self {
            ApiError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "status": "error",
            "error": message,
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_status_codes() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::RateLimited {
                retry_after_secs: 1
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::SecurityBlocked { pattern: "rm-rf" }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
