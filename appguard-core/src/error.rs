use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppGuardError {
    /// Malformed base64, CBOR or DER supplied by the client.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported attestation format: {0}")]
    UnsupportedFormat(String),

    #[error("Attestation statement carries no certificate chain")]
    MissingCertificateChain,

    #[error("Certificate chain verification failed")]
    ChainVerification,

    #[error("Missing certificate extension {0}")]
    MissingExtension(String),

    #[error("Extension policy rejected attestation: {0}")]
    PolicyRejected(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("No public key bound for device {0}")]
    KeyNotBound(String),

    #[error("A public key is already bound for device {0}")]
    KeyAlreadyBound(String),

    #[error("No outstanding challenge for device {0}")]
    ChallengeUnavailable(String),

    #[error("Assertion signature is invalid")]
    SignatureInvalid,

    #[error("Trust store error: {0}")]
    TrustStore(String),

    #[error("Token invalid: {0}")]
    TokenInvalid(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Credentials rejected for device {0}")]
    CredentialsRejected(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppGuardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(uuid) => Self::DeviceNotFound(uuid),
            StoreError::KeyAlreadyBound(uuid) => Self::KeyAlreadyBound(uuid),
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

impl AppGuardError {
    /// True for failures of the attestation/assertion protocol itself, as
    /// opposed to lookups, configuration or token problems.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::UnsupportedFormat(_)
                | Self::MissingCertificateChain
                | Self::ChainVerification
                | Self::MissingExtension(_)
                | Self::PolicyRejected(_)
                | Self::KeyNotBound(_)
                | Self::KeyAlreadyBound(_)
                | Self::ChallengeUnavailable(_)
                | Self::SignatureInvalid
        )
    }
}

pub type Result<T> = std::result::Result<T, AppGuardError>;
