//! End-to-end device credential flow through the public API:
//! register → attest → assert → tokens → refresh.

use std::io::Write;
use std::sync::Arc;

use appguard_core::testing::{encode_attestation, sign_assertion, CertificateAuthority};
use appguard_core::{
    AppGuardError, AssertionVerifier, AttestationVerifier, ChallengeIssuer, DeviceState,
    DeviceStore, InMemoryDeviceStore, PermissivePolicy, RootTrustStore, SessionTokenIssuer,
    TokenConfig,
};
use chrono::Duration;

#[tokio::test]
async fn test_full_device_lifecycle() {
    let ca = CertificateAuthority::generate();
    let mut root_file = tempfile::NamedTempFile::new().unwrap();
    root_file.write_all(&ca.root_pem()).unwrap();

    let store = Arc::new(InMemoryDeviceStore::new());
    let trust = Arc::new(RootTrustStore::new(root_file.path()));
    trust.get_root_certificate().expect("root loads at startup");

    let challenges = ChallengeIssuer::new(store.clone());
    let attestation = AttestationVerifier::new(store.clone(), trust, Arc::new(PermissivePolicy));
    let assertion = AssertionVerifier::new(store.clone());
    let tokens = SessionTokenIssuer::new(
        TokenConfig::new("s3ss10n", "r3fr3sh", Duration::minutes(15), Duration::days(30)).unwrap(),
    );

    // 1. Register
    let registration = challenges.register_device(None).await.unwrap();
    let device_uuid = registration.device_uuid.clone();
    let c0 = registration.challenge.into_string();

    // 2. Attest
    let leaf = ca.issue_leaf(Some(b"TEAMID.com.example"));
    let attested = attestation
        .verify_attestation("key-1", &encode_attestation(&ca, &leaf), &device_uuid)
        .await
        .unwrap();
    let c1 = attested.challenge.into_string();
    assert_ne!(c0, c1);

    let device = store.get_device(&device_uuid).await.unwrap().unwrap();
    assert_eq!(device.state, DeviceState::Attested);
    assert_eq!(device.public_key_pem(), Some(leaf.public_key_pem().as_str()));

    // 3. An assertion over the stale challenge fails
    let stale = sign_assertion(&leaf.key, b"auth", &c0);
    let err = assertion
        .verify_assertion("key-1", &stale, &device_uuid)
        .await
        .unwrap_err();
    assert!(matches!(err, AppGuardError::SignatureInvalid));

    // 4. The current one succeeds
    let current = sign_assertion(&leaf.key, b"auth", &c1);
    let outcome = assertion
        .verify_assertion("key-1", &current, &device_uuid)
        .await
        .unwrap();
    assert_eq!(outcome.user_uuid, registration.user_uuid);
    assert!(store.activate_session(&device_uuid).await.unwrap());

    // 5. Tokens
    let pair = tokens
        .create_tokens(&outcome.user_uuid, &outcome.device_uuid)
        .unwrap();
    assert!(tokens.validate_session(&pair.session_token));

    let rotated = tokens.refresh(&pair.refresh_token).unwrap();
    let claims = tokens.decode_session(&rotated.session_token).unwrap();
    assert_eq!(claims.user_id, registration.user_uuid);
    assert_eq!(claims.device_uuid, device_uuid);

    // 6. The next request needs a new challenge
    let c2 = challenges.issue_challenge(&device_uuid).await.unwrap();
    let next = sign_assertion(&leaf.key, b"auth-2", c2.as_str());
    assertion
        .verify_assertion("key-1", &next, &device_uuid)
        .await
        .unwrap();

    let device = store.get_device(&device_uuid).await.unwrap().unwrap();
    assert_eq!(device.state, DeviceState::SessionActive);
    assert!(device.challenge.is_none());
}
