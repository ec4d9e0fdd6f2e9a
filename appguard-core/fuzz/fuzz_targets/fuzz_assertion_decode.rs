#![no_main]

//! Fuzz target for AssertionObject::from_cbor()
//!
//! Run with: cargo +nightly fuzz run fuzz_assertion_decode

use appguard_core::AssertionObject;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(assertion) = AssertionObject::from_cbor(data) {
        let _ = assertion.signed_payload("00112233445566778899aabbccddeeff");
    }
});
