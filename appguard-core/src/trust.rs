//! Pinned root of trust for attestation chains.
//!
//! The root certificate is read from disk once and cached for the lifetime
//! of the process. Concurrent first calls race to load it but only one value
//! is ever stored; every later call is a lock-free read.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use openssl::x509::X509;

use crate::error::{AppGuardError, Result};

/// Environment variable naming the PEM root certificate.
pub const ROOT_CA_PATH_ENV: &str = "APPLE_ROOT_CA_PATH";

/// Lazily loaded, immutable root certificate.
pub struct RootTrustStore {
    path: Option<PathBuf>,
    root: OnceLock<X509>,
}

impl RootTrustStore {
    /// Trust store backed by the PEM file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            root: OnceLock::new(),
        }
    }

    /// Trust store configured from `APPLE_ROOT_CA_PATH`.
    ///
    /// An unset variable is not an error here; it surfaces on first use.
    pub fn from_env() -> Self {
        Self {
            path: std::env::var(ROOT_CA_PATH_ENV)
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            root: OnceLock::new(),
        }
    }

    /// Trust store around an already parsed certificate.
    pub fn with_certificate(root: X509) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(root);
        Self { path: None, root: cell }
    }

    /// Return the pinned root certificate, loading it on first use.
    ///
    /// # Errors
    ///
    /// [`AppGuardError::TrustStore`] if no path is configured, the file
    /// cannot be read, or it does not hold a PEM X.509 certificate.
    pub fn get_root_certificate(&self) -> Result<&X509> {
        if let Some(root) = self.root.get() {
            return Ok(root);
        }

        let path = self.path.as_deref().ok_or_else(|| {
            tracing::error!(env = ROOT_CA_PATH_ENV, "Root certificate path not configured");
            AppGuardError::TrustStore(format!("{ROOT_CA_PATH_ENV} is not set"))
        })?;

        let loaded = load_pem_certificate(path)?;
        tracing::info!(path = %path.display(), "Loaded pinned root certificate");

        // A racing loader may have won; keep whichever value landed first.
        Ok(self.root.get_or_init(|| loaded))
    }

    /// Whether the root certificate has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.root.get().is_some()
    }
}

fn load_pem_certificate(path: &Path) -> Result<X509> {
    let pem = std::fs::read(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Root certificate file unreadable");
        AppGuardError::TrustStore(format!("cannot read {}: {e}", path.display()))
    })?;

    X509::from_pem(&pem).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Root certificate is not valid PEM X.509");
        AppGuardError::TrustStore(format!("invalid certificate in {}: {e}", path.display()))
    })
}

impl std::fmt::Debug for RootTrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootTrustStore")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CertificateAuthority;
    use std::io::Write;

    #[test]
    fn test_loads_and_caches_root() {
        let ca = CertificateAuthority::generate();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&ca.root_pem()).unwrap();

        let store = RootTrustStore::new(file.path());
        assert!(!store.is_loaded());

        let first = store.get_root_certificate().unwrap().to_der().unwrap();
        assert!(store.is_loaded());

        // Removing the file must not matter once cached
        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());

        let second = store.get_root_certificate().unwrap().to_der().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_path_is_trust_store_error() {
        let store = RootTrustStore {
            path: None,
            root: OnceLock::new(),
        };
        assert!(matches!(
            store.get_root_certificate(),
            Err(AppGuardError::TrustStore(_))
        ));
    }

    #[test]
    fn test_unreadable_file_is_trust_store_error() {
        let store = RootTrustStore::new("/nonexistent/root-ca.pem");
        assert!(matches!(
            store.get_root_certificate(),
            Err(AppGuardError::TrustStore(_))
        ));
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_garbage_file_is_trust_store_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a certificate").unwrap();

        let store = RootTrustStore::new(file.path());
        assert!(matches!(
            store.get_root_certificate(),
            Err(AppGuardError::TrustStore(_))
        ));
    }

    #[test]
    fn test_concurrent_first_load() {
        let ca = CertificateAuthority::generate();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&ca.root_pem()).unwrap();

        let store = std::sync::Arc::new(RootTrustStore::new(file.path()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.get_root_certificate().unwrap().to_der().unwrap())
            })
            .collect();

        let ders: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ders.windows(2).all(|w| w[0] == w[1]));
    }
}
