//! Session token authentication
//!
//! Provides the `AuthenticatedSession` extractor for Axum handlers. Tokens are
//! HS256 session tokens minted by this service at login.

use appguard_core::{AppGuardError, SessionClaims};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Claims of a valid, unexpired session token.
///
/// Returns 401 with `AUTH_MISSING_TOKEN`, `AUTH_INVALID_TOKEN` or
/// `AUTH_TOKEN_EXPIRED` on failure.
pub struct AuthenticatedSession(pub SessionClaims);

impl FromRequestParts<AppState> for AuthenticatedSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;

        let claims = state.tokens.decode_session(token).map_err(|e| match e {
            AppGuardError::TokenExpired => {
                ApiError::auth_error("AUTH_TOKEN_EXPIRED", "Session token has expired")
            }
            other => ApiError::auth_error(
                "AUTH_INVALID_TOKEN",
                format!("Session token rejected: {}", other),
            ),
        })?;

        Ok(AuthenticatedSession(claims))
    }
}

/// Extract the Bearer token from the Authorization header
fn extract_bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| {
            ApiError::auth_error("AUTH_MISSING_TOKEN", "Missing Authorization header")
        })?;

    let auth_value = auth_header.to_str().map_err(|_| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Invalid Authorization header encoding",
        )
    })?;

    auth_value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Authorization header must use Bearer scheme",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/session");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_bearer_token() {
        let parts = parts_with(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header() {
        let err = extract_bearer_token(&parts_with(None)).unwrap_err();
        assert_eq!(err.error_code(), "AUTH_MISSING_TOKEN");
    }

    #[test]
    fn test_wrong_scheme() {
        let err = extract_bearer_token(&parts_with(Some("Basic dXNlcjpwYXNz"))).unwrap_err();
        assert_eq!(err.error_code(), "AUTH_INVALID_TOKEN");
    }
}
