//! CLI integration tests for appguard-cli.
//!
//! These tests run the actual binary against attestation objects,
//! certificates and tokens generated at test time.

use appguard_core::testing::{attestation_cbor, encode_attestation, CertificateAuthority};
use appguard_core::{SessionTokenIssuer, TokenConfig};
use assert_cmd::Command;
use base64::Engine;
use chrono::{Duration, Utc};
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SECRET: &str = "cli-session-secret";

/// Get a Command for the appguard binary.
fn appguard() -> Command {
    Command::cargo_bin("appguard").unwrap()
}

struct Fixture {
    _temp: TempDir,
    attestation: PathBuf,
    root: PathBuf,
    rogue_root: PathBuf,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let ca = CertificateAuthority::generate();
    let rogue = CertificateAuthority::generate();
    let leaf = ca.issue_leaf(Some(b"TEAMID.com.example.app"));

    let attestation = temp.path().join("attestation.b64");
    let root = temp.path().join("root.pem");
    let rogue_root = temp.path().join("rogue.pem");
    fs::write(&attestation, encode_attestation(&ca, &leaf)).unwrap();
    fs::write(&root, ca.root_pem()).unwrap();
    fs::write(&rogue_root, rogue.root_pem()).unwrap();

    Fixture {
        _temp: temp,
        attestation,
        root,
        rogue_root,
    }
}

fn issuer() -> SessionTokenIssuer {
    SessionTokenIssuer::new(
        TokenConfig::new(SECRET, "cli-refresh-secret", Duration::minutes(15), Duration::days(30))
            .unwrap(),
    )
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    appguard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Device attestation operator tooling"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("verify-chain"))
        .stdout(predicate::str::contains("token"));
}

#[test]
fn test_help_shows_exit_codes() {
    appguard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("66"));
}

#[test]
fn test_version_displays_version() {
    appguard()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("appguard"));
}

// ============================================================================
// Inspect Tests
// ============================================================================

#[test]
fn test_inspect_prints_chain_and_identifier() {
    let f = fixture();
    let identifier = "5445414d49442e636f6d2e6578616d706c652e617070";

    appguard()
        .args(["inspect", f.attestation.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("apple-appattest"))
        .stdout(predicate::str::contains("CN=device-leaf"))
        .stdout(predicate::str::contains("CN=AppGuard Test Intermediate CA"))
        .stdout(predicate::str::contains(identifier));
}

#[test]
fn test_inspect_json_from_stdin() {
    let f = fixture();
    let input = fs::read_to_string(&f.attestation).unwrap();

    let output = appguard()
        .args(["inspect", "-", "--json"])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["fmt"], "apple-appattest");
    assert_eq!(report["certificates"].as_array().unwrap().len(), 2);
    assert_eq!(
        report["extension_identifier"],
        "5445414d49442e636f6d2e6578616d706c652e617070"
    );
}

#[test]
fn test_inspect_without_chain() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.b64");
    let cbor = attestation_cbor("apple-appattest", Vec::new(), b"auth");
    fs::write(&path, base64::engine::general_purpose::STANDARD.encode(cbor)).unwrap();

    appguard()
        .args(["inspect", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing"));
}

#[test]
fn test_inspect_missing_file_returns_input_error() {
    // Exit code 66 = EX_NOINPUT
    appguard()
        .args(["inspect", "nonexistent.b64"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read input"));
}

#[test]
fn test_inspect_garbage_returns_data_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("garbage.b64");
    fs::write(&path, "not base64 at all!").unwrap();

    appguard()
        .args(["inspect", path.to_str().unwrap()])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Failed to decode attestation object"));
}

// ============================================================================
// Verify-Chain Tests
// ============================================================================

#[test]
fn test_verify_chain_trusted() {
    let f = fixture();
    appguard()
        .args([
            "verify-chain",
            f.attestation.to_str().unwrap(),
            "--root",
            f.root.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("TRUSTED"));
}

#[test]
fn test_verify_chain_wrong_root_fails() {
    let f = fixture();
    appguard()
        .args([
            "verify-chain",
            f.attestation.to_str().unwrap(),
            "--root",
            f.rogue_root.to_str().unwrap(),
        ])
        .assert()
        .code(65)
        .stdout(predicate::str::contains("REJECTED"))
        .stderr(predicate::str::contains("Chain verification failed"));
}

#[test]
fn test_verify_chain_quiet_prints_nothing() {
    let f = fixture();
    appguard()
        .args([
            "--quiet",
            "verify-chain",
            f.attestation.to_str().unwrap(),
            "--root",
            f.rogue_root.to_str().unwrap(),
        ])
        .assert()
        .code(65)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_verify_chain_missing_root_returns_input_error() {
    let f = fixture();
    appguard()
        .args([
            "verify-chain",
            f.attestation.to_str().unwrap(),
            "--root",
            "/nonexistent/root.pem",
        ])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read root certificate"));
}

// ============================================================================
// Token Tests
// ============================================================================

#[test]
fn test_token_valid() {
    let pair = issuer().create_tokens("user-1", "device-1").unwrap();
    appguard()
        .args(["token", &pair.session_token, "--secret", SECRET])
        .assert()
        .success()
        .stdout(predicate::str::contains("VALID"))
        .stdout(predicate::str::contains("user-1"))
        .stdout(predicate::str::contains("device-1"));
}

#[test]
fn test_token_wrong_secret_fails() {
    let pair = issuer().create_tokens("user-1", "device-1").unwrap();
    appguard()
        .args(["token", &pair.session_token, "--secret", "other-secret"])
        .assert()
        .code(65)
        .stdout(predicate::str::contains("INVALID"))
        .stderr(predicate::str::contains("signature mismatch"));
}

#[test]
fn test_token_expired_fails() {
    let pair = issuer()
        .issue_pair_at("user-1", "device-1", Utc::now() - Duration::hours(1))
        .unwrap();
    appguard()
        .args(["token", &pair.session_token, "--secret", SECRET])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("token expired"));
}

#[test]
fn test_token_requires_secret() {
    appguard()
        .args(["token", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--secret"));
}
