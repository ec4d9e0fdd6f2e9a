//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use appguard_core::{
    AppGuardError, AssertionVerifier, AttestationVerifier, ChallengeIssuer, DenyAllVerifier,
    DeviceStore, ExpectedIdentifierPolicy, ExtensionPolicy, InMemoryDeviceStore, MfaVerifier,
    PermissivePolicy, RootTrustStore, SessionTokenIssuer, StaticCodeVerifier, TokenConfig,
};

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Device records
    pub store: Arc<dyn DeviceStore>,
    /// Pinned root certificate
    pub trust: Arc<RootTrustStore>,
    pub challenges: ChallengeIssuer,
    pub attestation: AttestationVerifier,
    pub assertion: AssertionVerifier,
    pub tokens: Arc<SessionTokenIssuer>,
    /// Second factor checked at login
    pub mfa: Arc<dyn MfaVerifier>,
}

impl AppState {
    /// Wire the verifiers around the given collaborators.
    pub fn new(
        store: Arc<dyn DeviceStore>,
        trust: Arc<RootTrustStore>,
        policy: Arc<dyn ExtensionPolicy>,
        tokens: SessionTokenIssuer,
        mfa: Arc<dyn MfaVerifier>,
    ) -> Self {
        Self {
            challenges: ChallengeIssuer::new(store.clone()),
            attestation: AttestationVerifier::new(store.clone(), trust.clone(), policy),
            assertion: AssertionVerifier::new(store.clone()),
            tokens: Arc::new(tokens),
            store,
            trust,
            mfa,
        }
    }

    /// Build state from server configuration with an in-memory device store.
    pub fn from_config(config: &Config, token_config: TokenConfig) -> Result<Self, AppGuardError> {
        let trust = match &config.root_ca_path {
            Some(path) => RootTrustStore::new(path),
            None => RootTrustStore::from_env(),
        };

        let policy: Arc<dyn ExtensionPolicy> = match &config.expected_identifier {
            Some(hex_id) => {
                let policy = ExpectedIdentifierPolicy::from_hex(hex_id).map_err(|e| {
                    AppGuardError::Config(format!("APP_ATTEST_EXPECTED_IDENTIFIER is not hex: {e}"))
                })?;
                tracing::info!("Extension policy: expected identifier");
                Arc::new(policy)
            }
            None => {
                tracing::warn!("Extension policy: permissive (identifier not checked)");
                Arc::new(PermissivePolicy)
            }
        };

        let mfa: Arc<dyn MfaVerifier> = match &config.mfa_static_code {
            Some(code) => Arc::new(StaticCodeVerifier::new(code.clone())),
            None => {
                tracing::warn!("MFA: no verifier configured, logins will be rejected");
                Arc::new(DenyAllVerifier)
            }
        };

        Ok(Self::new(
            Arc::new(InMemoryDeviceStore::new()),
            Arc::new(trust),
            policy,
            SessionTokenIssuer::new(token_config),
            mfa,
        ))
    }
}
