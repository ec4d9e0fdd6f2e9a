//! Leaf -> intermediate -> root signature chain verification.
//!
//! The wire chain omits the root: `chain[0]` is the leaf, `chain[1]` the
//! intermediate, and the intermediate is checked against the pinned root
//! rather than any further wire certificate. Validity periods and revocation
//! are not checked.

use openssl::error::ErrorStack;
use openssl::x509::{X509Ref, X509};

/// Verify `chain` (leaf first) up to `root`.
///
/// Returns `true` only if the leaf is signed by `chain[1]` and `chain[1]` is
/// signed by `root`. Malformed keys, algorithm mismatches and bad signatures
/// all yield `false`.
pub fn verify_chain(chain: &[X509], root: &X509Ref) -> bool {
    let (leaf, intermediate) = match chain {
        [leaf, intermediate, ..] => (leaf, intermediate),
        _ => {
            tracing::warn!(len = chain.len(), "Certificate chain too short");
            return false;
        }
    };

    match signed_by(leaf, intermediate) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Leaf certificate not signed by intermediate");
            return false;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Leaf signature check errored");
            return false;
        }
    }

    match signed_by(intermediate, root) {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!("Intermediate certificate not signed by pinned root");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "Intermediate signature check errored");
            false
        }
    }
}

/// Check `cert`'s signature under `issuer`'s public key, using the digest
/// declared in `cert`'s signature algorithm.
fn signed_by(cert: &X509Ref, issuer: &X509Ref) -> Result<bool, ErrorStack> {
    let issuer_key = issuer.public_key()?;
    cert.verify(&issuer_key)
}
