//! TLS configuration and certificate loading.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

/// Error type for TLS credential handling.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("TLS certificate '{}' not found", .0.display())]
    MissingCertificate(PathBuf),

    #[error("TLS private key '{}' not found", .0.display())]
    MissingKey(PathBuf),

    #[error("invalid PEM in '{}': {reason}", path.display())]
    InvalidPem { path: PathBuf, reason: String },

    #[error("failed to load TLS configuration: {0}")]
    Load(#[source] std::io::Error),
}

impl TlsError {
    /// Whether the error is a credential file that does not exist.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, TlsError::MissingCertificate(_) | TlsError::MissingKey(_))
    }
}

/// Verify both credential files exist, certificate first.
///
/// Only a path that does not exist fails here. Other stat errors, such as
/// permission denied, surface when the files are read.
pub fn check_credentials(cert_path: &Path, key_path: &Path) -> Result<(), TlsError> {
    if not_found(cert_path) {
        return Err(TlsError::MissingCertificate(cert_path.to_path_buf()));
    }
    if not_found(key_path) {
        return Err(TlsError::MissingKey(key_path.to_path_buf()));
    }
    Ok(())
}

fn not_found(path: &Path) -> bool {
    matches!(std::fs::metadata(path), Err(e) if e.kind() == ErrorKind::NotFound)
}

/// Check that the files hold at least one certificate and a private key.
async fn validate_pem(cert_path: &Path, key_path: &Path) -> Result<(), TlsError> {
    let invalid = |path: &Path, reason: String| TlsError::InvalidPem {
        path: path.to_path_buf(),
        reason,
    };

    let cert_pem = tokio::fs::read(cert_path)
        .await
        .map_err(|e| invalid(cert_path, e.to_string()))?;
    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(cert_path, e.to_string()))?;
    if certs.is_empty() {
        return Err(invalid(cert_path, "no certificates found".to_string()));
    }

    let key_pem = tokio::fs::read(key_path)
        .await
        .map_err(|e| invalid(key_path, e.to_string()))?;
    match rustls_pemfile::private_key(&mut key_pem.as_slice()) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(invalid(key_path, "no private key found".to_string())),
        Err(e) => Err(invalid(key_path, e.to_string())),
    }
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    check_credentials(cert_path, key_path)?;
    validate_pem(cert_path, key_path).await?;

    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(TlsError::Load)
}
