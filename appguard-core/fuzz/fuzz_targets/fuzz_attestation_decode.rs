#![no_main]

//! Fuzz target for AttestationObject::from_cbor()
//!
//! Exercises CBOR decoding, DER certificate parsing and the extension
//! walker on whatever leaf the input carries.
//!
//! Run with: cargo +nightly fuzz run fuzz_attestation_decode

use appguard_core::{find_app_attest_extension, AttestationObject};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(attestation) = AttestationObject::from_cbor(data) {
        let _ = attestation.certificates();
        if let Some(leaf) = attestation.x5c.first() {
            let _ = find_app_attest_extension(leaf);
        }
    }
});
