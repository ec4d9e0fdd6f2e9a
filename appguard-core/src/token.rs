//! Session and refresh token issuance (HS256 JWT).
//!
//! Both tokens carry the same claims but are signed with independent
//! secrets, so a refresh token is never accepted as a session token and
//! vice versa. Refreshing always rotates both tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppGuardError, Result};

pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";
pub const REFRESH_SECRET_ENV: &str = "REFRESH_SECRET";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_MINUTES";
pub const REFRESH_TTL_ENV: &str = "REFRESH_TTL_MINUTES";

/// Default session token lifetime (15 minutes).
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 15;
/// Default refresh token lifetime (30 days).
pub const DEFAULT_REFRESH_TTL_MINUTES: i64 = 43_200;

/// Signing secrets and lifetimes.
#[derive(Clone)]
pub struct TokenConfig {
    session_secret: String,
    refresh_secret: String,
    pub session_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Both secrets must be non-empty and different.
    pub fn new(
        session_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        session_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self> {
        let config = Self {
            session_secret: session_secret.into(),
            refresh_secret: refresh_secret.into(),
            session_ttl,
            refresh_ttl,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from `SESSION_SECRET`, `REFRESH_SECRET`, `SESSION_TTL_MINUTES`
    /// and `REFRESH_TTL_MINUTES`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = |name: &str| {
            lookup(name)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| AppGuardError::Config(format!("{name} is not set")))
        };
        let minutes = |name: &str, default: i64| {
            lookup(name)
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|m| *m > 0)
                .unwrap_or(default)
        };

        Self::new(
            secret(SESSION_SECRET_ENV)?,
            secret(REFRESH_SECRET_ENV)?,
            Duration::minutes(minutes(SESSION_TTL_ENV, DEFAULT_SESSION_TTL_MINUTES)),
            Duration::minutes(minutes(REFRESH_TTL_ENV, DEFAULT_REFRESH_TTL_MINUTES)),
        )
    }

    fn validate(&self) -> Result<()> {
        if self.session_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(AppGuardError::Config("token secrets must not be empty".into()));
        }
        if self.session_secret == self.refresh_secret {
            return Err(AppGuardError::Config(
                "session and refresh secrets must differ".into(),
            ));
        }
        if self.session_ttl <= Duration::zero() || self.refresh_ttl <= Duration::zero() {
            return Err(AppGuardError::Config("token TTLs must be positive".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("session_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("session_ttl_minutes", &self.session_ttl.num_minutes())
            .field("refresh_ttl_minutes", &self.refresh_ttl.num_minutes())
            .finish()
    }
}

/// Claims shared by session and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: String,
    pub device_uuid: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique per minted token
    pub jti: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub session_token: String,
    pub refresh_token: String,
}

pub struct SessionTokenIssuer {
    config: TokenConfig,
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
}

impl SessionTokenIssuer {
    pub fn new(config: TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            session_encoding: EncodingKey::from_secret(config.session_secret.as_bytes()),
            session_decoding: DecodingKey::from_secret(config.session_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            config,
            validation,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mint a fresh session/refresh pair.
    pub fn create_tokens(&self, user_uuid: &str, device_uuid: &str) -> Result<TokenPair> {
        self.issue_pair_at(user_uuid, device_uuid, Utc::now())
    }

    /// Mint a pair as if issued at `now`.
    pub fn issue_pair_at(
        &self,
        user_uuid: &str,
        device_uuid: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair> {
        let claims = |ttl: Duration| SessionClaims {
            user_id: user_uuid.to_string(),
            device_uuid: device_uuid.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        let session_token = encode(&header, &claims(self.config.session_ttl), &self.session_encoding)
            .map_err(|e| AppGuardError::Internal(format!("session token encoding failed: {e}")))?;
        let refresh_token = encode(&header, &claims(self.config.refresh_ttl), &self.refresh_encoding)
            .map_err(|e| AppGuardError::Internal(format!("refresh token encoding failed: {e}")))?;

        tracing::debug!(user_uuid = %user_uuid, device_uuid = %device_uuid, "Issued token pair");

        Ok(TokenPair {
            session_token,
            refresh_token,
        })
    }

    /// Whether `token` is a well-signed, unexpired session token.
    pub fn validate_session(&self, token: &str) -> bool {
        self.decode_session(token).is_ok()
    }

    /// Decode and validate a session token.
    pub fn decode_session(&self, token: &str) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, &self.session_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppGuardError::TokenExpired,
                _ => AppGuardError::TokenInvalid(e.to_string()),
            })
    }

    /// Exchange a refresh token for a new pair carrying the same identity.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = decode::<SessionClaims>(refresh_token, &self.refresh_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!(error = %e, "Refresh token rejected");
                AppGuardError::TokenInvalid(e.to_string())
            })?;

        tracing::info!(
            user_uuid = %claims.user_id,
            device_uuid = %claims.device_uuid,
            "Refreshed session"
        );
        self.create_tokens(&claims.user_id, &claims.device_uuid)
    }
}

impl std::fmt::Debug for SessionTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenIssuer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn issuer() -> SessionTokenIssuer {
        SessionTokenIssuer::new(
            TokenConfig::new(
                "session-secret",
                "refresh-secret",
                Duration::minutes(15),
                Duration::minutes(60),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_fresh_session_token_validates() {
        let issuer = issuer();
        let pair = issuer.create_tokens("user-1", "dev-1").unwrap();
        assert!(issuer.validate_session(&pair.session_token));

        let claims = issuer.decode_session(&pair.session_token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.device_uuid, "dev-1");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_session_token_expires_after_ttl() {
        let issuer = issuer();
        let pair = issuer
            .issue_pair_at("user-1", "dev-1", Utc::now() - Duration::minutes(16))
            .unwrap();
        assert!(!issuer.validate_session(&pair.session_token));
        assert!(matches!(
            issuer.decode_session(&pair.session_token),
            Err(AppGuardError::TokenExpired)
        ));
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let issuer = issuer();
        let pair = issuer.create_tokens("user-1", "dev-1").unwrap();
        assert!(!issuer.validate_session(&pair.refresh_token));
        assert!(matches!(
            issuer.refresh(&pair.session_token),
            Err(AppGuardError::TokenInvalid(_))
        ));
    }

    #[test]
    fn test_foreign_secret_and_garbage_rejected() {
        let issuer = issuer();
        let other = SessionTokenIssuer::new(
            TokenConfig::new("other-s", "other-r", Duration::minutes(15), Duration::minutes(60))
                .unwrap(),
        );
        let pair = other.create_tokens("user-1", "dev-1").unwrap();
        assert!(!issuer.validate_session(&pair.session_token));
        assert!(!issuer.validate_session("not.a.jwt"));
        assert!(!issuer.validate_session(""));
        assert!(matches!(
            issuer.decode_session(&pair.session_token),
            Err(AppGuardError::TokenInvalid(_))
        ));
    }

    #[test]
    fn test_refresh_rotates_pair() {
        let issuer = issuer();
        let pair = issuer.create_tokens("user-1", "dev-1").unwrap();
        let rotated = issuer.refresh(&pair.refresh_token).unwrap();

        assert_ne!(rotated.session_token, pair.session_token);
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        let claims = issuer.decode_session(&rotated.session_token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.device_uuid, "dev-1");
    }

    #[test]
    fn test_expired_refresh_token_rejected() {
        let issuer = issuer();
        let pair = issuer
            .issue_pair_at("user-1", "dev-1", Utc::now() - Duration::minutes(61))
            .unwrap();
        assert!(matches!(
            issuer.refresh(&pair.refresh_token),
            Err(AppGuardError::TokenInvalid(_))
        ));
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (SESSION_SECRET_ENV, "s"),
            (REFRESH_SECRET_ENV, "r"),
            (SESSION_TTL_ENV, "5"),
            (REFRESH_TTL_ENV, "not-a-number"),
        ]
        .into_iter()
        .collect();
        let config = TokenConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.session_ttl, Duration::minutes(5));
        assert_eq!(config.refresh_ttl, Duration::minutes(DEFAULT_REFRESH_TTL_MINUTES));
        assert!(!format!("{config:?}").contains("\"s\""));
    }

    #[test]
    fn test_config_rejects_missing_or_equal_secrets() {
        assert!(matches!(
            TokenConfig::from_lookup(|_| None),
            Err(AppGuardError::Config(_))
        ));
        assert!(matches!(
            TokenConfig::from_lookup(|k| Some(if k.ends_with("SECRET") { "same" } else { "10" }.into())),
            Err(AppGuardError::Config(_))
        ));
        assert!(TokenConfig::new("a", "b", Duration::zero(), Duration::minutes(1)).is_err());
    }
}
