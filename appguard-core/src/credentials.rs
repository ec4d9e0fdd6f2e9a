//! Second-factor check performed at login, after device verification.

use serde::{Deserialize, Serialize};

/// Login request credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredentials {
    pub user_uuid: String,
    pub device_uuid: String,
    pub mfa_code: String,
}

pub trait MfaVerifier: Send + Sync {
    fn verify(&self, credentials: &UserCredentials) -> bool;
}

/// Rejects every login. Used until a real second factor is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAllVerifier;

impl MfaVerifier for DenyAllVerifier {
    fn verify(&self, credentials: &UserCredentials) -> bool {
        tracing::warn!(user_uuid = %credentials.user_uuid, "No MFA verifier configured; login denied");
        false
    }
}

/// Accepts a single shared code.
#[derive(Clone)]
pub struct StaticCodeVerifier {
    code: String,
}

impl StaticCodeVerifier {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl MfaVerifier for StaticCodeVerifier {
    fn verify(&self, credentials: &UserCredentials) -> bool {
        !self.code.is_empty()
            && constant_time_eq(credentials.mfa_code.as_bytes(), self.code.as_bytes())
    }
}

/// Length leaks; content does not.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && openssl::memcmp::eq(a, b)
}

impl std::fmt::Debug for StaticCodeVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCodeVerifier").finish_non_exhaustive()
    }
}
