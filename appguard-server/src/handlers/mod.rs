//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod device;
pub mod health;
pub mod session;

pub use crate::state::AppState;
pub use device::{
    assert_handler, attest_handler, challenge_handler, register_device_handler, AssertRequest,
    AssertResponse, AttestRequest, ChallengeRequest, ChallengeResponse, RegisterDeviceRequest,
    RegisterDeviceResponse,
};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use session::{
    login_handler, refresh_handler, session_handler, LoginRequest, RefreshRequest,
    SessionResponse, TokenResponse,
};
