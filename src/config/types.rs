//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:3000")
    pub listen_addr: String,

    /// Directory served for every path other than `/ws`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("client/build")
}

/// TLS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Path to TLS certificate file (PEM)
    pub cert_path: PathBuf,

    /// Path to TLS private key file (PEM)
    pub key_path: PathBuf,
}

/// Pointer backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerConfig {
    /// Backend selection ("auto", "uinput", "automation")
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Name the uinput device registers with
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

fn default_backend() -> String {
    "auto".to_string()
}
fn default_device_name() -> String {
    "virtual-mouse".to_string()
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            device_name: default_device_name(),
        }
    }
}

/// Per-connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Send a keep-alive after this many seconds without inbound frames
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

fn default_keep_alive_secs() -> u64 {
    25
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl SessionConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when neither RUST_LOG nor -v is given
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}
