//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 document for the AppGuard API.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{
    AssertRequest, AssertResponse, AttestRequest, ChallengeRequest, ChallengeResponse,
    HealthResponse, LoginRequest, ReadyResponse, RefreshRequest, RegisterDeviceRequest,
    RegisterDeviceResponse, SessionResponse, TokenResponse,
};

/// AppGuard API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AppGuard - Device Attestation API",
        version = "0.1.0",
        description = r#"
## Hardware-Rooted Device Authentication

### Flow

1. **Register** a device via `POST /device/register` and receive its first challenge
2. **Attest** the device's hardware key via `POST /device/attest`; the response carries the next challenge
3. **Assert** possession of the key by signing `authenticatorData || SHA-256(challenge)` via `POST /device/assert`
4. **Log in** via `POST /session/login` to obtain a session/refresh token pair
5. **Refresh** via `POST /session/refresh`; both tokens rotate

Each challenge is single-use. Request a new one with `POST /device/challenge`.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Device", description = "Device registration, attestation and assertion"),
        (name = "Session", description = "Session token issuance and refresh"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::device::register_device_handler,
        crate::handlers::device::challenge_handler,
        crate::handlers::device::attest_handler,
        crate::handlers::device::assert_handler,
        crate::handlers::session::login_handler,
        crate::handlers::session::refresh_handler,
        crate::handlers::session::session_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            RegisterDeviceRequest,
            RegisterDeviceResponse,
            ChallengeRequest,
            ChallengeResponse,
            AttestRequest,
            AssertRequest,
            AssertResponse,
            LoginRequest,
            RefreshRequest,
            TokenResponse,
            SessionResponse,
        )
    ),
    modifiers(&SessionTokenScheme)
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by protected paths.
struct SessionTokenScheme;

impl Modify for SessionTokenScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
