//! Test fixtures: throwaway certificate authorities, attested leaf keys and
//! encoded attestation/assertion objects.
//!
//! Only compiled for tests or with the `test-util` feature. Everything here
//! panics on failure.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ciborium::value::Value;
use openssl::asn1::{Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::sign::Signer;
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509Builder, X509Extension, X509Name, X509NameBuilder, X509NameRef, X509Ref, X509};

use crate::attestation::{APP_ATTEST_EXTENSION_OID, APP_ATTEST_FORMAT};

/// Root + intermediate pair standing in for the platform CA.
pub struct CertificateAuthority {
    pub root: X509,
    pub intermediate: X509,
    intermediate_key: PKey<Private>,
}

/// Leaf certificate and the device private key it certifies.
pub struct LeafCredential {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl LeafCredential {
    pub fn public_key_pem(&self) -> String {
        let pem = self.cert.public_key().unwrap().public_key_to_pem().unwrap();
        String::from_utf8(pem).unwrap()
    }
}

impl CertificateAuthority {
    pub fn generate() -> Self {
        let root_key = ec_key();
        let root_name = name("AppGuard Test Root CA");
        let root = build_cert(&root_name, &root_name, &root_key, &root_key, true, None);

        let intermediate_key = ec_key();
        let intermediate = build_cert(
            &name("AppGuard Test Intermediate CA"),
            &root_name,
            &intermediate_key,
            &root_key,
            true,
            None,
        );

        Self {
            root,
            intermediate,
            intermediate_key,
        }
    }

    pub fn root_pem(&self) -> Vec<u8> {
        self.root.to_pem().unwrap()
    }

    /// Issue a device leaf. With `identifier`, the leaf carries the
    /// attestation extension wrapping it as `SEQUENCE { [1] OCTET STRING }`.
    pub fn issue_leaf(&self, identifier: Option<&[u8]>) -> LeafCredential {
        let key = ec_key();
        let extension = identifier.map(|id| {
            let value = der_tlv(0x30, &der_tlv(0xa1, &der_tlv(0x04, id)));
            attestation_extension(&value)
        });
        let cert = build_cert(
            &name("device-leaf"),
            self.intermediate.subject_name(),
            &key,
            &self.intermediate_key,
            false,
            extension,
        );
        LeafCredential { cert, key }
    }

    /// Issue a leaf whose attestation extension holds arbitrary bytes.
    pub fn issue_leaf_with_raw_extension(&self, value: &[u8]) -> LeafCredential {
        let key = ec_key();
        let cert = build_cert(
            &name("device-leaf"),
            self.intermediate.subject_name(),
            &key,
            &self.intermediate_key,
            false,
            Some(attestation_extension(value)),
        );
        LeafCredential { cert, key }
    }

    /// DER chain as sent on the wire: leaf, intermediate.
    pub fn wire_chain(&self, leaf: &LeafCredential) -> Vec<Vec<u8>> {
        vec![leaf.cert.to_der().unwrap(), self.intermediate.to_der().unwrap()]
    }
}

/// Copy of `cert` with one byte of its signature value flipped.
pub fn flip_signature_byte(cert: &X509Ref, index: usize) -> X509 {
    let mut der = cert.to_der().unwrap();
    let sig_len = cert.signature().as_slice().len();
    let pos = der.len() - sig_len + (index % sig_len);
    der[pos] ^= 0x01;
    X509::from_der(&der).unwrap()
}

/// CBOR attestation object with the given parts.
pub fn attestation_cbor(fmt: &str, x5c: Vec<Vec<u8>>, auth_data: &[u8]) -> Vec<u8> {
    let att_stmt = Value::Map(vec![
        (
            Value::Text("x5c".into()),
            Value::Array(x5c.into_iter().map(Value::Bytes).collect()),
        ),
        (Value::Text("receipt".into()), Value::Bytes(vec![0u8; 8])),
    ]);
    let object = Value::Map(vec![
        (Value::Text("fmt".into()), Value::Text(fmt.into())),
        (Value::Text("attStmt".into()), att_stmt),
        (Value::Text("authData".into()), Value::Bytes(auth_data.to_vec())),
    ]);
    to_cbor(&object)
}

/// Base64 attestation object in the supported format.
pub fn encode_attestation(ca: &CertificateAuthority, leaf: &LeafCredential) -> String {
    BASE64.encode(attestation_cbor(
        APP_ATTEST_FORMAT,
        ca.wire_chain(leaf),
        b"test-auth-data",
    ))
}

/// Base64 assertion object over `authenticator_data || SHA-256(challenge)`.
pub fn sign_assertion(key: &PKeyRef<Private>, authenticator_data: &[u8], challenge: &str) -> String {
    let client_data_hash = openssl::sha::sha256(challenge.as_bytes());
    let mut signer = Signer::new(MessageDigest::sha256(), key).unwrap();
    signer.update(authenticator_data).unwrap();
    signer.update(&client_data_hash).unwrap();
    let signature = signer.sign_to_vec().unwrap();
    encode_assertion(authenticator_data, &signature)
}

/// Base64 assertion object with explicit parts.
pub fn encode_assertion(authenticator_data: &[u8], signature: &[u8]) -> String {
    let object = Value::Map(vec![
        (Value::Text("signature".into()), Value::Bytes(signature.to_vec())),
        (
            Value::Text("authenticatorData".into()),
            Value::Bytes(authenticator_data.to_vec()),
        ),
    ]);
    BASE64.encode(to_cbor(&object))
}

pub fn to_cbor(value: &Value) -> Vec<u8> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).unwrap();
    bytes
}

fn attestation_extension(value: &[u8]) -> X509Extension {
    let oid = Asn1Object::from_str(APP_ATTEST_EXTENSION_OID).unwrap();
    let contents = Asn1OctetString::new_from_bytes(value).unwrap();
    X509Extension::new_from_der(&oid, false, &contents).unwrap()
}

fn der_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let len_bytes: Vec<u8> = len
            .to_be_bytes()
            .iter()
            .copied()
            .skip_while(|b| *b == 0)
            .collect();
        out.push(0x80 | len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
    out.extend_from_slice(content);
    out
}

fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn name(common_name: &str) -> X509Name {
    let mut builder = X509NameBuilder::new().unwrap();
    builder
        .append_entry_by_nid(Nid::COMMONNAME, common_name)
        .unwrap();
    builder.build()
}

fn build_cert(
    subject: &X509NameRef,
    issuer: &X509NameRef,
    key: &PKeyRef<Private>,
    signing_key: &PKeyRef<Private>,
    is_ca: bool,
    extension: Option<X509Extension>,
) -> X509 {
    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
    builder
        .set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();

    builder.set_subject_name(subject).unwrap();
    builder.set_issuer_name(issuer).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();

    if is_ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
    }
    if let Some(extension) = extension {
        builder.append_extension(extension).unwrap();
    }

    builder.sign(signing_key, MessageDigest::sha256()).unwrap();
    builder.build()
}
