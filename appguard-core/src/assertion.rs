//! Assertion decoding and verification.
//!
//! After attestation, every protected action carries an assertion: an ECDSA
//! signature by the attested key over
//! `authenticatorData || SHA-256(challenge)`. A verified assertion consumes
//! the challenge, so the same assertion can never be accepted twice.

use std::sync::Arc;

use ciborium::value::Value;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Verifier;
use serde::Serialize;

use crate::cbor::{decode_b64_map, decode_map, get_bytes_field};
use crate::error::{AppGuardError, Result};
use crate::store::DeviceStore;

/// Decoded assertion object. Never persisted.
#[derive(Debug, Clone)]
pub struct AssertionObject {
    pub authenticator_data: Vec<u8>,
    /// DER-encoded ECDSA signature.
    pub signature: Vec<u8>,
}

impl AssertionObject {
    pub fn from_base64(input: &str) -> Result<Self> {
        Self::from_map(&decode_b64_map(input, "assertion")?)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Self::from_map(&decode_map(bytes, "assertion")?)
    }

    fn from_map(map: &[(Value, Value)]) -> Result<Self> {
        Ok(Self {
            authenticator_data: get_bytes_field(map, "authenticatorData")?,
            signature: get_bytes_field(map, "signature")?,
        })
    }

    /// Bytes covered by the signature for `challenge`.
    pub fn signed_payload(&self, challenge: &str) -> Vec<u8> {
        let client_data_hash = openssl::sha::sha256(challenge.as_bytes());
        let mut payload = Vec::with_capacity(self.authenticator_data.len() + client_data_hash.len());
        payload.extend_from_slice(&self.authenticator_data);
        payload.extend_from_slice(&client_data_hash);
        payload
    }
}

/// Identity proven by a verified assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionOutcome {
    pub device_uuid: String,
    pub user_uuid: String,
}

#[derive(Clone)]
pub struct AssertionVerifier {
    store: Arc<dyn DeviceStore>,
}

impl AssertionVerifier {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// Verify `assertion_b64` against the key attested for `device_uuid`
    /// under `key_id`, consuming the device's current challenge.
    pub async fn verify_assertion(
        &self,
        key_id: &str,
        assertion_b64: &str,
        device_uuid: &str,
    ) -> Result<AssertionOutcome> {
        let assertion = AssertionObject::from_base64(assertion_b64).inspect_err(|e| {
            tracing::warn!(device_uuid = %device_uuid, error = %e, "Assertion decode failed");
        })?;

        let device = self
            .store
            .get_device(device_uuid)
            .await?
            .ok_or_else(|| AppGuardError::DeviceNotFound(device_uuid.to_string()))?;

        let public_key_pem = match &device.key {
            Some(bound) if bound.key_id == key_id => bound.public_key_pem.as_str(),
            Some(_) => {
                tracing::warn!(device_uuid = %device_uuid, key_id = %key_id, "Assertion key id does not match attested key");
                return Err(AppGuardError::KeyNotBound(device_uuid.to_string()));
            }
            None => {
                tracing::warn!(device_uuid = %device_uuid, "Assertion before attestation");
                return Err(AppGuardError::KeyNotBound(device_uuid.to_string()));
            }
        };

        let challenge = device.challenge.as_deref().ok_or_else(|| {
            tracing::warn!(device_uuid = %device_uuid, "Assertion without outstanding challenge");
            AppGuardError::ChallengeUnavailable(device_uuid.to_string())
        })?;

        if !verify_signature(public_key_pem, &assertion.signed_payload(challenge), &assertion.signature)? {
            tracing::warn!(device_uuid = %device_uuid, "Assertion signature rejected");
            return Err(AppGuardError::SignatureInvalid);
        }

        // Lost a race with a concurrent assertion for the same challenge
        if !self.store.consume_challenge(device_uuid, challenge).await? {
            tracing::warn!(device_uuid = %device_uuid, "Challenge consumed concurrently");
            return Err(AppGuardError::ChallengeUnavailable(device_uuid.to_string()));
        }

        tracing::info!(device_uuid = %device_uuid, user_uuid = %device.user_uuid, "Assertion verified");

        Ok(AssertionOutcome {
            device_uuid: device.uuid,
            user_uuid: device.user_uuid,
        })
    }
}

/// ECDSA/SHA-256 check of a DER signature. A malformed signature is a
/// failed check; an unusable stored key is an internal error.
fn verify_signature(public_key_pem: &str, payload: &[u8], signature: &[u8]) -> Result<bool> {
    let key = PKey::public_key_from_pem(public_key_pem.as_bytes())
        .map_err(|e| AppGuardError::Internal(format!("stored public key unusable: {e}")))?;
    let mut verifier = Verifier::new(MessageDigest::sha256(), &key)
        .map_err(|e| AppGuardError::Internal(format!("verifier setup failed: {e}")))?;

    let verified = verifier
        .update(payload)
        .and_then(|_| verifier.verify(signature));
    match verified {
        Ok(ok) => Ok(ok),
        Err(e) => {
            tracing::debug!(error = %e, "Signature verification errored");
            Ok(false)
        }
    }
}
