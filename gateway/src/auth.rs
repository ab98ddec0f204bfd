//! Request authentication.
//!
//! Every route except `/health` requires the shared token in the
//! configured header. The comparison visits every byte so timing does not
//! leak how much of a guessed token matched.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

fn tokens_match(presented: &str, expected: &str) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Middleware gate: reject requests without the correct token.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(&state.config.auth_header)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(token) if tokens_match(token, &state.config.auth_token) => Ok(next.run(request).await),
        Some(_) => {
            debug!("rejected request with wrong token");
            Err(ApiError::Unauthorized)
        }
        None => {
            debug!("rejected request with no token");
            Err(ApiError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_passes() {
        assert!(tokens_match("secret", "secret"));
    }

    #[test]
    fn wrong_or_truncated_token_fails() {
        assert!(!tokens_match("secreT", "secret"));
        assert!(!tokens_match("secre", "secret"));
        assert!(!tokens_match("", "secret"));
    }
}
