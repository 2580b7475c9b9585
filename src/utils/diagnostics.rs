//! System Diagnostics
//!
//! Startup logging of the host and desktop session, used to explain which
//! pointer backend gets picked.

use sysinfo::System;
use tracing::info;

use crate::pointer::DisplayServer;

/// System information for diagnostics
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Operating system name (e.g., "Linux", "Ubuntu")
    pub os_name: String,
    /// Operating system version string
    pub os_version: String,

    /// Kernel version string
    pub kernel_version: String,

    /// CPU architecture
    pub arch: &'static str,

    /// Number of logical CPU cores
    pub cpu_count: usize,

    /// System hostname
    pub hostname: String,
}

impl SystemInfo {
    /// Gather system information
    pub fn gather() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();

        Self {
            os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| "Unknown".to_string()),
            arch: std::env::consts::ARCH,
            cpu_count: sys.cpus().len(),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }

    /// Log system information
    pub fn log(&self) {
        info!("=== System Information ===");
        info!("  OS: {} {} ({})", self.os_name, self.os_version, self.arch);
        info!("  Kernel: {}", self.kernel_version);
        info!("  Hostname: {}", self.hostname);
        info!("  CPUs: {}", self.cpu_count);
    }
}

/// Desktop session variables that drive backend selection
#[derive(Debug, Clone, Default)]
pub struct SessionEnvironment {
    pub session_type: Option<String>,
    pub wayland_display: Option<String>,
    pub x11_display: Option<String>,
}

impl SessionEnvironment {
    pub fn gather() -> Self {
        Self {
            session_type: std::env::var("XDG_SESSION_TYPE").ok(),
            wayland_display: std::env::var("WAYLAND_DISPLAY").ok(),
            x11_display: std::env::var("DISPLAY").ok(),
        }
    }

    pub fn display_server(&self) -> DisplayServer {
        DisplayServer::from_env(
            std::env::consts::OS,
            self.session_type.as_deref(),
            self.wayland_display.as_deref(),
            self.x11_display.as_deref(),
        )
    }
}

fn or_unset(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("<unset>")
}

/// Log complete diagnostics on startup
pub fn log_startup_diagnostics() {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║          Startup Diagnostics                              ║");
    info!("╚════════════════════════════════════════════════════════════╝");

    SystemInfo::gather().log();

    let env = SessionEnvironment::gather();
    let server = env.display_server();
    info!("=== Desktop Session ===");
    info!("  XDG_SESSION_TYPE: {}", or_unset(&env.session_type));
    info!("  WAYLAND_DISPLAY: {}", or_unset(&env.wayland_display));
    info!("  DISPLAY: {}", or_unset(&env.x11_display));
    info!("  Display server: {}", server);
    match server.preferred_backend() {
        Some(kind) => info!("  Auto backend: {:?}", kind),
        None => info!("  Auto backend: none available"),
    }

    info!("=== Server Configuration ===");
    info!("  Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Automation backend: {}",
        if cfg!(feature = "automation") {
            "compiled in"
        } else {
            "not compiled in"
        }
    );
    #[cfg(debug_assertions)]
    info!("  Build: debug");
    #[cfg(not(debug_assertions))]
    info!("  Build: release");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_info_gather() {
        let info = SystemInfo::gather();
        assert!(!info.os_name.is_empty());
        assert!(!info.arch.is_empty());
    }

    #[test]
    fn test_session_environment_wayland() {
        let env = SessionEnvironment {
            session_type: Some("wayland".to_string()),
            wayland_display: Some("wayland-0".to_string()),
            x11_display: Some(":0".to_string()),
        };
        if cfg!(target_os = "linux") {
            assert_eq!(env.display_server(), DisplayServer::Wayland);
        }
    }

    #[test]
    fn test_or_unset() {
        assert_eq!(or_unset(&None), "<unset>");
        assert_eq!(or_unset(&Some(":1".to_string())), ":1");
    }
}
