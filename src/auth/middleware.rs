use crate::types::{AppError, Result};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Header carrying the shared configuration token.
pub const CONFIG_TOKEN_HEADER: &str = "x-token";

/// Reject requests whose `X-Token` header does not match `CONFIG_TOKEN`.
pub async fn require_config_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let provided = req
        .headers()
        .get(CONFIG_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing X-Token header".to_string()))?;

    if !token_matches(provided, &state.settings.auth.config_token) {
        warn!(path = %req.uri().path(), "Rejected config request with invalid token");
        return Err(AppError::Auth("Invalid token".to_string()));
    }

    Ok(next.run(req).await)
}

/// Compare fixed-size digests so the check does not leak the token length.
pub fn token_matches(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("secret-token", "secret-token"));
        assert!(!token_matches("secret-token ", "secret-token"));
        assert!(!token_matches("", "secret-token"));
    }
}
