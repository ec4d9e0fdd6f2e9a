//! Attestation object decoding and verification.
//!
//! A client proves that its key lives in secure hardware by submitting a
//! base64 CBOR attestation object. Verification walks the leaf certificate
//! up to the pinned root, reads the protocol extension off the leaf, and on
//! success binds the leaf's public key to the device and rotates its
//! challenge.

use std::sync::Arc;

use ciborium::value::Value;
use openssl::x509::X509;
use serde::Serialize;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::cbor::{decode_b64_map, decode_map, find_field, get_bytes_field, get_map_field, get_text_field};
use crate::chain::verify_chain;
use crate::challenge::Challenge;
use crate::error::{AppGuardError, Result};
use crate::extension::{decode_extension_value, AppAttestExtension, ExtensionPolicy};
use crate::store::DeviceStore;
use crate::trust::RootTrustStore;

/// Required value of the attestation object's `fmt` field.
pub const APP_ATTEST_FORMAT: &str = "apple-appattest";

/// OID of the attestation extension carried by the leaf certificate.
pub const APP_ATTEST_EXTENSION_OID: &str = "1.2.840.113635.100.8.2";

/// Decoded attestation object. Never persisted.
#[derive(Debug, Clone)]
pub struct AttestationObject {
    pub fmt: String,
    /// DER certificates, leaf first. Empty if `attStmt.x5c` was absent.
    pub x5c: Vec<Vec<u8>>,
    pub auth_data: Vec<u8>,
    pub receipt: Option<Vec<u8>>,
}

impl AttestationObject {
    /// Decode a base64 CBOR attestation object.
    pub fn from_base64(input: &str) -> Result<Self> {
        Self::from_map(&decode_b64_map(input, "attestation")?)
    }

    /// Decode raw CBOR bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Self::from_map(&decode_map(bytes, "attestation")?)
    }

    fn from_map(map: &[(Value, Value)]) -> Result<Self> {
        let fmt = get_text_field(map, "fmt")?;
        let att_stmt = get_map_field(map, "attStmt")?;
        let auth_data = get_bytes_field(map, "authData")?;

        let x5c = match find_field(att_stmt, "x5c") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Bytes(der) => Ok(der.clone()),
                    _ => Err(AppGuardError::Decode(
                        "x5c element is not a byte string".into(),
                    )),
                })
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        let receipt = match find_field(att_stmt, "receipt") {
            Some(Value::Bytes(b)) => Some(b.clone()),
            _ => None,
        };

        Ok(Self {
            fmt,
            x5c,
            auth_data,
            receipt,
        })
    }

    /// Parse every `x5c` entry as a DER certificate.
    pub fn certificates(&self) -> Result<Vec<X509>> {
        self.x5c
            .iter()
            .enumerate()
            .map(|(i, der)| {
                X509::from_der(der).map_err(|e| {
                    AppGuardError::Decode(format!("x5c[{i}] is not a DER certificate: {e}"))
                })
            })
            .collect()
    }
}

/// Locate and decode the attestation extension of a DER certificate.
///
/// `Ok(None)` if the certificate has no such extension.
pub fn find_app_attest_extension(der: &[u8]) -> Result<Option<AppAttestExtension>> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| AppGuardError::Decode(format!("leaf certificate: {e}")))?;

    let Some(ext) = cert
        .extensions()
        .iter()
        .find(|ext| ext.oid.to_id_string() == APP_ATTEST_EXTENSION_OID)
    else {
        return Ok(None);
    };

    decode_extension_value(ext.value)
        .map(Some)
        .map_err(|e| AppGuardError::Decode(format!("attestation extension: {e}")))
}

/// Result of a successful attestation.
#[derive(Debug, Clone, Serialize)]
pub struct AttestationOutcome {
    /// Fresh challenge for the device's first assertion.
    pub challenge: Challenge,
    pub extension: AppAttestExtension,
}

/// Verifies attestation objects and binds the attested key to a device.
#[derive(Clone)]
pub struct AttestationVerifier {
    store: Arc<dyn DeviceStore>,
    trust: Arc<RootTrustStore>,
    policy: Arc<dyn ExtensionPolicy>,
}

impl AttestationVerifier {
    pub fn new(
        store: Arc<dyn DeviceStore>,
        trust: Arc<RootTrustStore>,
        policy: Arc<dyn ExtensionPolicy>,
    ) -> Self {
        Self {
            store,
            trust,
            policy,
        }
    }

    /// Verify `attestation_b64` for `device_uuid` and bind the leaf key
    /// under `key_id`.
    ///
    /// The device record is only touched once every check has passed.
    pub async fn verify_attestation(
        &self,
        key_id: &str,
        attestation_b64: &str,
        device_uuid: &str,
    ) -> Result<AttestationOutcome> {
        let object = AttestationObject::from_base64(attestation_b64).inspect_err(|e| {
            tracing::warn!(device_uuid = %device_uuid, error = %e, "Attestation decode failed");
        })?;

        if object.fmt != APP_ATTEST_FORMAT {
            tracing::warn!(device_uuid = %device_uuid, fmt = %object.fmt, "Unsupported attestation format");
            return Err(AppGuardError::UnsupportedFormat(object.fmt));
        }

        if object.x5c.is_empty() {
            tracing::warn!(device_uuid = %device_uuid, "Attestation without certificate chain");
            return Err(AppGuardError::MissingCertificateChain);
        }

        let chain = object.certificates().inspect_err(|e| {
            tracing::warn!(device_uuid = %device_uuid, error = %e, "Attestation chain not parseable");
        })?;
        tracing::debug!(
            device_uuid = %device_uuid,
            certificates = chain.len(),
            auth_data_len = object.auth_data.len(),
            "Decoded attestation object"
        );

        let root = self.trust.get_root_certificate()?;
        if !verify_chain(&chain, root) {
            tracing::warn!(device_uuid = %device_uuid, "Attestation chain rejected");
            return Err(AppGuardError::ChainVerification);
        }

        let extension = find_app_attest_extension(&object.x5c[0])?.ok_or_else(|| {
            tracing::warn!(device_uuid = %device_uuid, "Leaf certificate lacks attestation extension");
            AppGuardError::MissingExtension(APP_ATTEST_EXTENSION_OID.to_string())
        })?;

        self.policy.evaluate(&extension).map_err(|reason| {
            tracing::warn!(device_uuid = %device_uuid, reason = %reason, "Extension policy rejected attestation");
            AppGuardError::PolicyRejected(reason)
        })?;

        let public_key_pem = leaf_public_key_pem(&chain[0])?;
        // Key and next challenge land in one record update
        let challenge = Challenge::generate()?;
        self.store
            .set_key_info(device_uuid, key_id, &public_key_pem, challenge.as_str())
            .await
            .map_err(|e| {
                tracing::warn!(device_uuid = %device_uuid, error = %e, "Could not bind attested key");
                AppGuardError::from(e)
            })?;

        tracing::info!(
            device_uuid = %device_uuid,
            key_id = %key_id,
            identifier = %extension.identifier_hex(),
            "Device attested"
        );

        Ok(AttestationOutcome {
            challenge,
            extension,
        })
    }
}

fn leaf_public_key_pem(leaf: &X509) -> Result<String> {
    let pem = leaf
        .public_key()
        .and_then(|key| key.public_key_to_pem())
        .map_err(|e| AppGuardError::Decode(format!("leaf public key: {e}")))?;
    String::from_utf8(pem).map_err(|e| AppGuardError::Internal(format!("PEM is not UTF-8: {e}")))
}
