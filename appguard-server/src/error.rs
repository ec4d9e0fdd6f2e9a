//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.
//! Attestation and assertion failures all collapse to one client-facing
//! message; the precise cause is only logged.

use appguard_core::AppGuardError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Authentication error with specific error code
    #[error("{message}")]
    AuthError { message: String, code: String },

    /// Error from the attestation/token library
    #[error("AppGuard error: {0}")]
    AppGuard(#[from] AppGuardError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an authentication error with a specific error code
    pub fn auth_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
            code: code.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthError { .. } => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::AppGuard(e) if e.is_verification_failure() => StatusCode::UNAUTHORIZED,
            Self::AppGuard(e) => match e {
                AppGuardError::DeviceNotFound(_) => StatusCode::NOT_FOUND,

                AppGuardError::TokenInvalid(_)
                | AppGuardError::TokenExpired
                | AppGuardError::CredentialsRejected(_) => StatusCode::UNAUTHORIZED,

                // Root of trust missing or unreadable
                AppGuardError::TrustStore(_) => StatusCode::SERVICE_UNAVAILABLE,

                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::AuthError { code, .. } => code.as_str(),
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::AppGuard(e) if e.is_verification_failure() => "DEVICE_VERIFICATION_FAILED",
            Self::AppGuard(e) => match e {
                AppGuardError::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
                AppGuardError::TokenExpired => "AUTH_TOKEN_EXPIRED",
                AppGuardError::TokenInvalid(_) => "AUTH_INVALID_TOKEN",
                AppGuardError::CredentialsRejected(_) => "AUTH_CREDENTIALS_REJECTED",
                AppGuardError::TrustStore(_) => "TRUST_STORE_UNAVAILABLE",
                _ => "INTERNAL_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::AppGuard(e) if e.is_verification_failure() => {
                "Device verification failed".to_string()
            }
            Self::AppGuard(e) => match e {
                AppGuardError::DeviceNotFound(_) => "Device not found".to_string(),
                AppGuardError::TokenExpired => "Token has expired".to_string(),
                AppGuardError::TokenInvalid(_) => "Invalid token".to_string(),
                AppGuardError::CredentialsRejected(_) => "Invalid credentials".to_string(),
                AppGuardError::TrustStore(_) => "Attestation service unavailable".to_string(),
                _ => "Internal server error".to_string(),
            },
            Self::Internal(_) => "Internal server error".to_string(),
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::AuthError { .. } => "auth_error",
            Self::Internal(_) => "internal",
            Self::AppGuard(e) if e.is_verification_failure() => "verification",
            Self::AppGuard(_) => "appguard",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code().to_string();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = %code,
                error = %internal_message,
                "Server error"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                status = %status,
                category = category,
                code = %code,
                error = %internal_message,
                "Authentication error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = %code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_failures_are_indistinguishable() {
        let failures = [
            AppGuardError::Decode("bad cbor".into()),
            AppGuardError::SignatureInvalid,
            AppGuardError::ChainVerification,
            AppGuardError::KeyNotBound("dev-1".into()),
            AppGuardError::ChallengeUnavailable("dev-1".into()),
        ];
        for failure in failures {
            let err = ApiError::from(failure);
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.error_code(), "DEVICE_VERIFICATION_FAILED");
            assert_eq!(err.client_message(), "Device verification failed");
        }
    }

    #[test]
    fn test_lookup_and_token_errors() {
        let err = ApiError::from(AppGuardError::DeviceNotFound("dev-1".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "DEVICE_NOT_FOUND");

        let err = ApiError::from(AppGuardError::TokenExpired);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "AUTH_TOKEN_EXPIRED");

        let err = ApiError::from(AppGuardError::TokenInvalid("sig".into()));
        assert_eq!(err.error_code(), "AUTH_INVALID_TOKEN");
        assert_eq!(err.client_message(), "Invalid token");
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = ApiError::from(AppGuardError::Store("connection reset by db-7".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.client_message().contains("db-7"));

        let err = ApiError::from(AppGuardError::TrustStore("/etc/secret/root.pem".into()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.client_message().contains("/etc"));
    }

    #[test]
    fn test_local_variants() {
        let err = ApiError::bad_request("'device_uuid' must not be empty");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(err.client_message().contains("device_uuid"));

        let err = ApiError::internal("governor config");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_auth_error_keeps_code() {
        let err = ApiError::auth_error("AUTH_MISSING_TOKEN", "Missing Authorization header");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "AUTH_MISSING_TOKEN");
    }
}
