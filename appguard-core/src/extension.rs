//! Attestation certificate extension decoding and policy.
//!
//! The leaf certificate carries a protocol extension whose value is a DER
//! `SEQUENCE`. The first `OCTET STRING` inside it (possibly wrapped in an
//! explicit context tag) is surfaced as the identifier. Whether that value is
//! acceptable is decided by an [`ExtensionPolicy`], kept separate from
//! decoding so stricter rules can be layered on.

use serde::{Deserialize, Serialize};
use x509_parser::der_parser::asn1_rs::{Any, Class, FromDer, Tag};

/// Decoded protocol extension of an attested leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppAttestExtension {
    /// First octet string found in the extension sequence.
    pub identifier: Vec<u8>,
}

impl AppAttestExtension {
    pub fn identifier_hex(&self) -> String {
        hex::encode(&self.identifier)
    }
}

/// Decide whether a decoded extension is acceptable.
pub trait ExtensionPolicy: Send + Sync {
    /// `Err(reason)` rejects the attestation.
    fn evaluate(&self, extension: &AppAttestExtension) -> Result<(), String>;
}

/// Accepts every identifier. The identifier is logged but not checked.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissivePolicy;

impl ExtensionPolicy for PermissivePolicy {
    fn evaluate(&self, extension: &AppAttestExtension) -> Result<(), String> {
        tracing::warn!(
            identifier = %extension.identifier_hex(),
            "Attestation extension identifier accepted without verification"
        );
        Ok(())
    }
}

/// Requires the identifier to equal a configured value.
#[derive(Debug, Clone)]
pub struct ExpectedIdentifierPolicy {
    expected: Vec<u8>,
}

impl ExpectedIdentifierPolicy {
    pub fn new(expected: impl Into<Vec<u8>>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    /// Policy from a hex string.
    pub fn from_hex(expected: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self::new(hex::decode(expected.trim())?))
    }
}

impl ExtensionPolicy for ExpectedIdentifierPolicy {
    fn evaluate(&self, extension: &AppAttestExtension) -> Result<(), String> {
        if crate::credentials::constant_time_eq(&extension.identifier, &self.expected) {
            Ok(())
        } else {
            Err(format!(
                "identifier {} does not match expected value",
                extension.identifier_hex()
            ))
        }
    }
}

/// Decode an extension value into an [`AppAttestExtension`].
pub fn decode_extension_value(value: &[u8]) -> Result<AppAttestExtension, String> {
    let (_, outer) = Any::from_der(value).map_err(|e| format!("malformed DER: {e}"))?;
    if outer.header.class() != Class::Universal || outer.header.tag() != Tag::Sequence {
        return Err(format!("expected SEQUENCE, found tag {}", outer.header.tag().0));
    }
    let identifier = first_octet_string(outer.data, MAX_NESTING)?
        .ok_or_else(|| "no OCTET STRING in sequence".to_string())?;
    Ok(AppAttestExtension {
        identifier: identifier.to_vec(),
    })
}

/// Wrapping levels searched below the outer SEQUENCE.
const MAX_NESTING: usize = 8;

fn first_octet_string(mut input: &[u8], depth: usize) -> Result<Option<&[u8]>, String> {
    while !input.is_empty() {
        let (rest, element) = Any::from_der(input).map_err(|e| format!("malformed DER: {e}"))?;
        let header = &element.header;
        if header.class() == Class::Universal && header.tag() == Tag::OctetString {
            return Ok(Some(element.data));
        }
        // Explicit context tags ([n] constructed) wrap the real element
        let constructed_context =
            header.class() == Class::ContextSpecific && header.is_constructed();
        let sequence = header.class() == Class::Universal && header.tag() == Tag::Sequence;
        if constructed_context || sequence {
            if depth == 0 {
                return Err("nesting too deep".into());
            }
            if let Some(found) = first_octet_string(element.data, depth - 1)? {
                return Ok(Some(found));
            }
        }
        input = rest;
    }
    Ok(None)
}
