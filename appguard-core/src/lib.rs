//! AppGuard Core - hardware-rooted device attestation library
//!
//! This crate verifies that a client device holds a key generated in secure
//! hardware, then proves possession of that key on every protected request
//! and issues short-lived session credentials.
//!
//! # Features
//!
//! - Attestation object decoding (base64 CBOR) and leaf → intermediate →
//!   pinned root chain verification
//! - Attestation extension decoding with a pluggable acceptance policy
//! - Challenge-bound ECDSA/SHA-256 assertion verification with single-use
//!   challenges
//! - HS256 session/refresh tokens with refresh rotation
//! - Explicit per-device credential state machine
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use appguard_core::{
//!     AssertionVerifier, AttestationVerifier, ChallengeIssuer, InMemoryDeviceStore,
//!     PermissivePolicy, RootTrustStore,
//! };
//!
//! # async fn example(attestation: &str, assertion: &str) -> appguard_core::Result<()> {
//! let store = Arc::new(InMemoryDeviceStore::new());
//! let trust = Arc::new(RootTrustStore::from_env());
//!
//! // Register the device and hand its first challenge to the client
//! let registration = ChallengeIssuer::new(store.clone()).register_device(None).await?;
//!
//! // The client attests its key; the response carries the next challenge
//! let attest = AttestationVerifier::new(store.clone(), trust, Arc::new(PermissivePolicy));
//! attest
//!     .verify_attestation("key-id", attestation, &registration.device_uuid)
//!     .await?;
//!
//! // Each protected request then carries an assertion over that challenge
//! let outcome = AssertionVerifier::new(store)
//!     .verify_assertion("key-id", assertion, &registration.device_uuid)
//!     .await?;
//! println!("verified device {} of user {}", outcome.device_uuid, outcome.user_uuid);
//! # Ok(())
//! # }
//! ```

pub mod assertion;
pub mod attestation;
mod cbor;
pub mod chain;
pub mod challenge;
pub mod credentials;
pub mod device;
pub mod error;
pub mod extension;
pub mod store;
pub mod token;
pub mod trust;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main types for convenience
pub use assertion::{AssertionObject, AssertionOutcome, AssertionVerifier};
pub use attestation::{
    find_app_attest_extension, AttestationObject, AttestationOutcome, AttestationVerifier,
    APP_ATTEST_EXTENSION_OID, APP_ATTEST_FORMAT,
};
pub use chain::verify_chain;
pub use challenge::{Challenge, ChallengeIssuer, DeviceRegistration, CHALLENGE_BYTES};
pub use credentials::{DenyAllVerifier, MfaVerifier, StaticCodeVerifier, UserCredentials};
pub use device::{BoundKey, Device, DeviceState};
pub use error::{AppGuardError, Result};
pub use extension::{AppAttestExtension, ExpectedIdentifierPolicy, ExtensionPolicy, PermissivePolicy};
pub use store::{DeviceStore, InMemoryDeviceStore, StoreError};
pub use token::{SessionClaims, SessionTokenIssuer, TokenConfig, TokenPair};
pub use trust::RootTrustStore;
