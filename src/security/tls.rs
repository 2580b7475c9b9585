//! TLS configuration
//!
//! Loads the PEM certificate chain and private key used by the HTTPS /
//! WebSocket listener. Phones only expose orientation sensors to secure
//! origins, so TLS is not optional.

use anyhow::{Context, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// TLS configuration wrapper
#[derive(Clone)]
pub struct TlsConfig {
    /// Certificate chain
    cert_chain: Vec<CertificateDer<'static>>,

    /// rustls ServerConfig
    server_config: Arc<ServerConfig>,
}

impl TlsConfig {
    /// Create TLS config from PEM files
    ///
    /// Accepts PKCS#8, PKCS#1 (RSA) and SEC1 (EC) private keys.
    pub fn from_files(cert_path: &Path, key_path: &Path) -> Result<Self> {
        info!("Loading TLS configuration from files");
        debug!("Certificate: {:?}", cert_path);
        debug!("Private key: {:?}", key_path);

        let cert_file = File::open(cert_path)
            .with_context(|| format!("Failed to open certificate file {:?}", cert_path))?;
        let certs = rustls_pemfile::certs(&mut BufReader::new(cert_file))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to parse certificate")?;

        if certs.is_empty() {
            anyhow::bail!("No certificates found in {:?}", cert_path);
        }

        let key_file = File::open(key_path)
            .with_context(|| format!("Failed to open private key file {:?}", key_path))?;
        let private_key: PrivateKeyDer<'static> =
            rustls_pemfile::private_key(&mut BufReader::new(key_file))
                .context("Failed to parse private key")?
                .ok_or_else(|| anyhow::anyhow!("No private key found in {:?}", key_path))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut server_config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .context("Failed to configure TLS versions")?
            .with_no_client_auth()
            .with_single_cert(certs.clone(), private_key)
            .context("Failed to configure certificate")?;

        // WebSocket upgrades need HTTP/1.1
        server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

        info!("TLS configuration created ({} certificates)", certs.len());

        Ok(Self {
            cert_chain: certs,
            server_config: Arc::new(server_config),
        })
    }

    /// Get rustls ServerConfig
    pub fn server_config(&self) -> Arc<ServerConfig> {
        self.server_config.clone()
    }

    /// Get certificate chain
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_certificate_file() {
        let err = TlsConfig::from_files(
            &PathBuf::from("/nonexistent/cert.pem"),
            &PathBuf::from("/nonexistent/key.pem"),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("Failed to open certificate file"));
    }

    #[test]
    fn test_empty_certificate_file() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "").unwrap();
        std::fs::write(&key, "").unwrap();

        let err = TlsConfig::from_files(&cert, &key).err().unwrap();
        assert!(err.to_string().contains("No certificates found"));
    }
}
