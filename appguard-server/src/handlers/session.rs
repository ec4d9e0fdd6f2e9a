//! Session handlers
//!
//! Login after device verification, token refresh and session introspection.

use appguard_core::{AppGuardError, TokenPair, UserCredentials};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthenticatedSession;
use crate::error::ApiError;
use crate::state::AppState;

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub user_uuid: String,
    pub device_uuid: String,
    pub mfa_code: String,
}

/// Request for rotating a token pair
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Session/refresh token pair
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub session_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            session_token: pair.session_token,
            refresh_token: pair.refresh_token,
        }
    }
}

/// Current session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: String,
    pub device_uuid: String,
    /// Expiry (unix seconds)
    pub expires_at: i64,
}

/// Log in
///
/// Requires a device owned by `user_uuid` that has completed an assertion,
/// and a valid second factor. Activates the device session and returns a
/// token pair.
#[utoipa::path(
    post,
    path = "/session/login",
    tag = "Session",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Credentials rejected"),
        (status = 404, description = "Unknown device")
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let owner = state
        .store
        .get_user_for_device(&req.device_uuid)
        .await
        .map_err(AppGuardError::from)?
        .ok_or_else(|| AppGuardError::DeviceNotFound(req.device_uuid.clone()))?;

    if owner != req.user_uuid {
        tracing::warn!(device_uuid = %req.device_uuid, "Login for device owned by another user");
        return Err(AppGuardError::CredentialsRejected(req.device_uuid).into());
    }

    let credentials = UserCredentials {
        user_uuid: req.user_uuid,
        device_uuid: req.device_uuid,
        mfa_code: req.mfa_code,
    };
    if !state.mfa.verify(&credentials) {
        return Err(AppGuardError::CredentialsRejected(credentials.device_uuid).into());
    }

    let activated = state
        .store
        .activate_session(&credentials.device_uuid)
        .await
        .map_err(AppGuardError::from)?;
    if !activated {
        tracing::warn!(device_uuid = %credentials.device_uuid, "Login before a verified assertion");
        return Err(AppGuardError::CredentialsRejected(credentials.device_uuid).into());
    }

    let pair = state
        .tokens
        .create_tokens(&credentials.user_uuid, &credentials.device_uuid)?;

    tracing::info!(
        user_uuid = %credentials.user_uuid,
        device_uuid = %credentials.device_uuid,
        "Session started"
    );

    Ok(Json(pair.into()))
}

/// Refresh tokens
///
/// Exchanges a valid refresh token for a new session/refresh pair.
#[utoipa::path(
    post,
    path = "/session/refresh",
    tag = "Session",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = TokenResponse),
        (status = 401, description = "Refresh token invalid or expired")
    )
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let pair = state.tokens.refresh(&req.refresh_token)?;
    Ok(Json(pair.into()))
}

/// Current session
///
/// Returns the claims of the bearer session token.
#[utoipa::path(
    get,
    path = "/session",
    tag = "Session",
    responses(
        (status = 200, description = "Session is valid", body = SessionResponse),
        (status = 401, description = "Missing, invalid or expired session token")
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn session_handler(
    AuthenticatedSession(claims): AuthenticatedSession,
) -> Json<SessionResponse> {
    Json(SessionResponse {
        user_id: claims.user_id,
        device_uuid: claims.device_uuid,
        expires_at: claims.exp,
    })
}
