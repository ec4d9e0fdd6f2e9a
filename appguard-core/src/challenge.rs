//! Per-device challenge issuance.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AppGuardError, Result};
use crate::store::DeviceStore;

/// Entropy per challenge (128 bits).
pub const CHALLENGE_BYTES: usize = 16;

/// Single-use nonce, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Challenge(String);

impl Challenge {
    /// Draw a fresh challenge from the system CSPRNG.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; CHALLENGE_BYTES];
        openssl::rand::rand_bytes(&mut bytes).map_err(|e| {
            tracing::error!(error = %e, "CSPRNG failure while generating challenge");
            AppGuardError::Internal(format!("random generation failed: {e}"))
        })?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A newly registered device and its first challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub device_uuid: String,
    pub user_uuid: String,
    pub challenge: Challenge,
}

/// Issues and rotates device challenges through the Device Store.
#[derive(Clone)]
pub struct ChallengeIssuer {
    store: Arc<dyn DeviceStore>,
}

impl ChallengeIssuer {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// Generate a challenge and make it the device's only outstanding one.
    pub async fn issue_challenge(&self, device_uuid: &str) -> Result<Challenge> {
        let challenge = Challenge::generate()?;
        self.store
            .update_challenge(device_uuid, challenge.as_str())
            .await?;
        tracing::debug!(device_uuid = %device_uuid, "Issued device challenge");
        Ok(challenge)
    }

    /// Same as [`issue_challenge`](Self::issue_challenge). Attestation does
    /// not go through here: it installs the follow-up challenge in the same
    /// store update that binds the key.
    pub async fn rotate_challenge(&self, device_uuid: &str) -> Result<Challenge> {
        let challenge = self.issue_challenge(device_uuid).await?;
        tracing::debug!(device_uuid = %device_uuid, "Rotated device challenge");
        Ok(challenge)
    }

    /// Create a device for `user_uuid` (or a brand new user) and issue its
    /// first challenge.
    pub async fn register_device(&self, user_uuid: Option<String>) -> Result<DeviceRegistration> {
        let user_uuid = user_uuid
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| {
                let generated = uuid::Uuid::new_v4().to_string();
                tracing::info!(user_uuid = %generated, "Assigned new user");
                generated
            });

        let device = self.store.create_device(&user_uuid).await?;
        let challenge = self.issue_challenge(&device.uuid).await?;

        tracing::info!(
            device_uuid = %device.uuid,
            user_uuid = %user_uuid,
            "Registered device"
        );

        Ok(DeviceRegistration {
            device_uuid: device.uuid,
            user_uuid,
            challenge,
        })
    }
}
