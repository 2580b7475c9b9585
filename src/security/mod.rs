//! Security module coordination
//!
//! TLS material for the listener and the per-run auth key that gates every
//! WebSocket session.

pub mod auth;
pub mod tls;

pub use auth::AuthKey;
pub use tls::TlsConfig;

use anyhow::Result;
use tracing::info;

use crate::config::Config;

/// Everything the server needs to authenticate and encrypt sessions
pub struct SecurityContext {
    tls_config: TlsConfig,
    auth_key: AuthKey,
}

impl SecurityContext {
    /// Load TLS files from the config and generate a fresh auth key
    pub fn new(config: &Config) -> Result<Self> {
        info!("Initializing security context");

        let tls_config =
            TlsConfig::from_files(&config.security.cert_path, &config.security.key_path)?;

        Ok(Self {
            tls_config,
            auth_key: AuthKey::generate(),
        })
    }

    pub fn tls_config(&self) -> &TlsConfig {
        &self.tls_config
    }

    pub fn auth_key(&self) -> &AuthKey {
        &self.auth_key
    }
}
