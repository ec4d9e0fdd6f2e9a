//! Device record and credential lifecycle.
//!
//! A device moves through an explicit state machine instead of having its
//! state inferred from nullable fields:
//!
//! ```text
//! Unregistered -> ChallengeIssued -> Attested -> Asserting -> SessionActive
//! ```
//!
//! Failed verifications never change state; the caller just gets an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credential lifecycle state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Unregistered,
    ChallengeIssued,
    /// Public key bound by a successful attestation.
    Attested,
    /// At least one assertion verified since attestation.
    Asserting,
    SessionActive,
}

impl DeviceState {
    /// Whether the device has proven possession of its attested key.
    pub fn has_asserted(self) -> bool {
        matches!(self, Self::Asserting | Self::SessionActive)
    }
}

/// Attested key material, set once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundKey {
    pub key_id: String,
    /// PEM-encoded EC public key (SubjectPublicKeyInfo).
    pub public_key_pem: String,
}

/// Reasons a lifecycle transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    KeyAlreadyBound,
    KeyNotBound,
    ChallengeMismatch,
    NotAsserted,
}

/// A registered client device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub uuid: String,
    pub user_uuid: String,
    pub key: Option<BoundKey>,
    /// Current single-use nonce (hex).
    pub challenge: Option<String>,
    pub state: DeviceState,
    pub create_date: DateTime<Utc>,
}

impl Device {
    pub fn new(uuid: String, user_uuid: String) -> Self {
        Self {
            uuid,
            user_uuid,
            key: None,
            challenge: None,
            state: DeviceState::Unregistered,
            create_date: Utc::now(),
        }
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key.as_ref().map(|k| k.key_id.as_str())
    }

    pub fn public_key_pem(&self) -> Option<&str> {
        self.key.as_ref().map(|k| k.public_key_pem.as_str())
    }

    /// Replace the outstanding challenge.
    pub fn issue_challenge(&mut self, challenge: String) {
        self.challenge = Some(challenge);
        if self.state == DeviceState::Unregistered {
            self.state = DeviceState::ChallengeIssued;
        }
    }

    /// Bind the attested key. Keys are never rotated.
    pub fn bind_key(&mut self, key_id: String, public_key_pem: String) -> Result<(), TransitionError> {
        if self.key.is_some() {
            return Err(TransitionError::KeyAlreadyBound);
        }
        self.key = Some(BoundKey {
            key_id,
            public_key_pem,
        });
        self.state = DeviceState::Attested;
        Ok(())
    }

    /// Clear the challenge if it still equals `expected`.
    pub fn consume_challenge(&mut self, expected: &str) -> Result<(), TransitionError> {
        if self.key.is_none() {
            return Err(TransitionError::KeyNotBound);
        }
        match self.challenge.as_deref() {
            Some(current) if current == expected => {
                self.challenge = None;
                if self.state != DeviceState::SessionActive {
                    self.state = DeviceState::Asserting;
                }
                Ok(())
            }
            _ => Err(TransitionError::ChallengeMismatch),
        }
    }

    pub fn activate_session(&mut self) -> Result<(), TransitionError> {
        if self.key.is_none() {
            return Err(TransitionError::KeyNotBound);
        }
        if !self.state.has_asserted() {
            return Err(TransitionError::NotAsserted);
        }
        self.state = DeviceState::SessionActive;
        Ok(())
    }
}
