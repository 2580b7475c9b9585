//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables (through clap `env` fallbacks)
//! - CLI arguments
//!
//! # Example
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:3000"
//! static_dir = "client/build"
//!
//! [security]
//! cert_path = "certs/localhost.pem"
//! key_path = "certs/localhost-key.pem"
//!
//! [pointer]
//! backend = "auto"
//!
//! [physics]
//! friction = 0.9
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub mod types;

pub use crate::controller::PhysicsConfig;
pub use types::{LoggingConfig, PointerConfig, SecurityConfig, ServerConfig, SessionConfig};

use crate::pointer::{BackendKind, UINPUT_MAX_NAME_LEN};

/// Port used when neither the file nor the command line names one
pub const DEFAULT_PORT: u16 = 3000;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// TLS configuration
    pub security: SecurityConfig,
    /// Pointer backend configuration
    #[serde(default)]
    pub pointer: PointerConfig,
    /// Physics tunables
    #[serde(default)]
    pub physics: PhysicsConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Result<Self> {
        Ok(Self::default())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Validate listen address
        self.server
            .listen_addr
            .parse::<SocketAddr>()
            .context("Invalid listen address")?;

        // Validate cert paths exist
        if !self.security.cert_path.exists() {
            anyhow::bail!("Certificate not found: {:?}", self.security.cert_path);
        }
        if !self.security.key_path.exists() {
            anyhow::bail!("Private key not found: {:?}", self.security.key_path);
        }

        // Validate backend choice
        if BackendKind::parse(&self.pointer.backend).is_none() {
            anyhow::bail!(
                "Invalid pointer backend: {} (expected one of: {})",
                self.pointer.backend,
                BackendKind::NAMES.join(", ")
            );
        }

        if self.pointer.device_name.is_empty()
            || self.pointer.device_name.len() > UINPUT_MAX_NAME_LEN
        {
            anyhow::bail!(
                "Invalid device name length: {} (1..={} bytes)",
                self.pointer.device_name.len(),
                UINPUT_MAX_NAME_LEN
            );
        }

        // Validate physics
        let physics = &self.physics;
        if !(0.0..1.0).contains(&physics.friction) || physics.friction == 0.0 {
            anyhow::bail!("friction ({}) must be between 0 and 1", physics.friction);
        }
        if physics.max_velocity.is_nan() || physics.max_velocity <= 0.0 {
            anyhow::bail!("max_velocity ({}) must be positive", physics.max_velocity);
        }
        if physics.move_scale.is_nan() || physics.move_scale <= 0.0 {
            anyhow::bail!("move_scale ({}) must be positive", physics.move_scale);
        }
        if physics.velocity_threshold.is_nan()
            || physics.velocity_threshold < 0.0
            || physics.rot_deadzone.is_nan()
            || physics.rot_deadzone < 0.0
        {
            anyhow::bail!("velocity_threshold and rot_deadzone cannot be negative");
        }
        if physics.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be positive");
        }
        if physics.max_dt_ms == 0 {
            anyhow::bail!("max_dt_ms must be positive");
        }

        if self.session.keep_alive_secs == 0 {
            anyhow::bail!("keep_alive_secs must be positive");
        }

        Ok(())
    }

    /// Override config with CLI arguments
    ///
    /// Only values actually given on the command line replace the file's.
    pub fn with_overrides(mut self, listen: Option<String>, port: Option<u16>) -> Self {
        let current_port = self
            .server
            .listen_addr
            .parse::<SocketAddr>()
            .map(|addr| addr.port())
            .unwrap_or(DEFAULT_PORT);

        if let Some(listen_addr) = listen {
            self.server.listen_addr = format!("{}:{}", listen_addr, port.unwrap_or(current_port));
        } else if let Some(port) = port {
            // Just update port
            if let Ok(mut addr) = self.server.listen_addr.parse::<SocketAddr>() {
                addr.set_port(port);
                self.server.listen_addr = addr.to_string();
            }
        }

        self
    }

    /// Override the pointer backend selection
    pub fn with_backend(mut self, backend: Option<String>) -> Self {
        if let Some(backend) = backend {
            self.pointer.backend = backend;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
                static_dir: PathBuf::from("client/build"),
            },
            security: SecurityConfig {
                cert_path: PathBuf::from("certs/localhost.pem"),
                key_path: PathBuf::from("certs/localhost-key.pem"),
            },
            pointer: PointerConfig::default(),
            physics: PhysicsConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
