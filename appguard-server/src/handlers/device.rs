//! Device attestation handlers
//!
//! Registration, challenge issuance, attestation and assertion.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// Request for registering a new device
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterDeviceRequest {
    /// Existing user to attach the device to (a new user is created when omitted)
    #[serde(default)]
    #[schema(example = "5f0c6b7e-2d2a-4a8e-9a55-4f7d0c1e9b21")]
    pub user_uuid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterDeviceResponse {
    /// First challenge (32 hex chars)
    pub challenge: String,
    pub device_uuid: String,
    pub user_uuid: String,
}

/// Request for a fresh challenge
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChallengeRequest {
    pub device_uuid: String,
}

/// Challenge issued to a device
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChallengeResponse {
    #[schema(example = "a1b2c3d4e5f60718293a4b5c6d7e8f90")]
    pub challenge: String,
    pub device_uuid: String,
}

/// Attestation submitted by a device
#[derive(Debug, Deserialize, ToSchema)]
pub struct AttestRequest {
    /// Identifier of the hardware key being attested
    pub key_id: String,
    /// Base64 CBOR attestation object
    pub attestation: String,
    pub device_uuid: String,
}

/// Assertion submitted by an attested device
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssertRequest {
    pub key_id: String,
    /// Base64 CBOR assertion object
    pub assertion: String,
    pub device_uuid: String,
}

/// Identity proven by an assertion
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssertResponse {
    pub device_uuid: String,
    pub user_uuid: String,
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

/// Register a device
///
/// Creates a device record (and a user when none is given) and returns the
/// device's first challenge.
#[utoipa::path(
    post,
    path = "/device/register",
    tag = "Device",
    request_body = RegisterDeviceRequest,
    responses(
        (status = 200, description = "Device registered", body = RegisterDeviceResponse),
        (status = 500, description = "Device store failure")
    )
)]
pub async fn register_device_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<Json<RegisterDeviceResponse>, ApiError> {
    let registration = state.challenges.register_device(req.user_uuid).await?;

    Ok(Json(RegisterDeviceResponse {
        challenge: registration.challenge.into_string(),
        device_uuid: registration.device_uuid,
        user_uuid: registration.user_uuid,
    }))
}

/// Issue a challenge
///
/// Replaces the device's outstanding challenge with a fresh one.
#[utoipa::path(
    post,
    path = "/device/challenge",
    tag = "Device",
    request_body = ChallengeRequest,
    responses(
        (status = 200, description = "Challenge issued", body = ChallengeResponse),
        (status = 400, description = "Missing device_uuid"),
        (status = 404, description = "Unknown device")
    )
)]
pub async fn challenge_handler(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    require("device_uuid", &req.device_uuid)?;

    let challenge = state.challenges.issue_challenge(&req.device_uuid).await?;

    Ok(Json(ChallengeResponse {
        challenge: challenge.into_string(),
        device_uuid: req.device_uuid,
    }))
}

/// Attest a device key
///
/// Verifies the attestation object against the pinned root, binds the
/// attested public key to the device and returns the next challenge.
#[utoipa::path(
    post,
    path = "/device/attest",
    tag = "Device",
    request_body = AttestRequest,
    responses(
        (status = 200, description = "Key attested; next challenge returned", body = ChallengeResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Device verification failed"),
        (status = 404, description = "Unknown device"),
        (status = 503, description = "Root of trust unavailable")
    )
)]
pub async fn attest_handler(
    State(state): State<AppState>,
    Json(req): Json<AttestRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    require("key_id", &req.key_id)?;
    require("attestation", &req.attestation)?;
    require("device_uuid", &req.device_uuid)?;

    let outcome = state
        .attestation
        .verify_attestation(&req.key_id, &req.attestation, &req.device_uuid)
        .await?;

    Ok(Json(ChallengeResponse {
        challenge: outcome.challenge.into_string(),
        device_uuid: req.device_uuid,
    }))
}

/// Verify an assertion
///
/// Checks the signature over the device's current challenge and consumes it.
#[utoipa::path(
    post,
    path = "/device/assert",
    tag = "Device",
    request_body = AssertRequest,
    responses(
        (status = 200, description = "Assertion verified", body = AssertResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Device verification failed"),
        (status = 404, description = "Unknown device")
    )
)]
pub async fn assert_handler(
    State(state): State<AppState>,
    Json(req): Json<AssertRequest>,
) -> Result<Json<AssertResponse>, ApiError> {
    require("key_id", &req.key_id)?;
    require("assertion", &req.assertion)?;
    require("device_uuid", &req.device_uuid)?;

    let outcome = state
        .assertion
        .verify_assertion(&req.key_id, &req.assertion, &req.device_uuid)
        .await?;

    Ok(Json(AssertResponse {
        device_uuid: outcome.device_uuid,
        user_uuid: outcome.user_uuid,
    }))
}
