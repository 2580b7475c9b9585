//! Virtual Pointer Backends
//!
//! Synthesizes operating-system mouse input. Two implementations exist:
//!
//! | Backend | Used on | Mechanism |
//! |---------|---------|-----------|
//! | [`UinputPointer`] | Linux Wayland sessions | Kernel virtual input device (`/dev/uinput`) |
//! | [`AutomationPointer`] | Linux X11, Windows, macOS | Host automation library (enigo) |
//!
//! The backend is chosen once at startup from the display environment:
//!
//! ```text
//! XDG_SESSION_TYPE=wayland ──────────────────────┐
//! WAYLAND_DISPLAY set, DISPLAY unset ────────────┴─> uinput
//! XDG_SESSION_TYPE=x11 / DISPLAY set ────────────┐
//! Windows / macOS ───────────────────────────────┴─> automation
//! anything else ─────────────────────────────────> unsupported display server
//! ```
//!
//! Backends are shared by every session task and the physics tick, so all
//! operations take `&self` and implementations serialize internally.

pub mod automation;
pub mod error;
#[cfg(target_os = "linux")]
pub mod uinput;

pub use automation::AutomationPointer;
pub use error::{PointerError, Result};
#[cfg(target_os = "linux")]
pub use uinput::UinputPointer;

use std::sync::Arc;
use tracing::{info, warn};

/// Longest device name the kernel accepts, excluding the NUL terminator
pub const UINPUT_MAX_NAME_LEN: usize = 79;

/// Mouse buttons the protocol can press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}

impl MouseButton {
    /// Convert to Linux button code
    pub fn to_linux_button(&self) -> u16 {
        match self {
            MouseButton::Left => 0x110,   // BTN_LEFT
            MouseButton::Right => 0x111,  // BTN_RIGHT
            MouseButton::Middle => 0x112, // BTN_MIDDLE
        }
    }
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
        }
    }
}

/// Capability set every pointer backend provides
#[cfg_attr(test, mockall::automock)]
pub trait PointerBackend: Send + Sync {
    /// Backend label for logs
    fn name(&self) -> &'static str;

    /// Move the cursor by `(dx, dy)` from its current position
    fn move_relative(&self, dx: i32, dy: i32) -> Result<()>;

    /// Scroll by `(dx, dy)` wheel steps; positive `dy` scrolls down
    fn scroll(&self, dx: i32, dy: i32) -> Result<()>;

    /// Press and hold a button
    fn press(&self, button: MouseButton) -> Result<()>;

    /// Release a held button
    fn release(&self, button: MouseButton) -> Result<()>;

    /// Put the cursor at the center of the primary display (best-effort)
    fn center_on_primary_display(&self) -> Result<()>;

    /// Release kernel / user-space handles. Calling twice is a no-op.
    fn close(&self) -> Result<()>;
}

/// Display server or platform the process runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    /// Linux Wayland session
    Wayland,
    /// Linux X11 session
    X11,
    /// Microsoft Windows
    Windows,
    /// macOS
    MacOs,
    /// Nothing we can drive
    Unknown,
}

impl DisplayServer {
    /// Detect from the current process environment
    pub fn detect() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self::from_env(
            std::env::consts::OS,
            var("XDG_SESSION_TYPE").as_deref(),
            var("WAYLAND_DISPLAY").as_deref(),
            var("DISPLAY").as_deref(),
        )
    }

    /// Classify an environment snapshot
    ///
    /// Empty variables count as unset.
    pub fn from_env(
        os: &str,
        session_type: Option<&str>,
        wayland_display: Option<&str>,
        x11_display: Option<&str>,
    ) -> Self {
        let set = |v: Option<&str>| v.is_some_and(|s| !s.is_empty());

        match os {
            "linux" => match session_type {
                Some("wayland") => DisplayServer::Wayland,
                Some("x11") => DisplayServer::X11,
                _ if set(wayland_display) && !set(x11_display) => DisplayServer::Wayland,
                _ if set(x11_display) => DisplayServer::X11,
                _ => DisplayServer::Unknown,
            },
            "windows" => DisplayServer::Windows,
            "macos" => DisplayServer::MacOs,
            _ => DisplayServer::Unknown,
        }
    }

    /// Backend the automatic selection rule picks for this display server
    pub fn preferred_backend(&self) -> Option<BackendKind> {
        match self {
            DisplayServer::Wayland => Some(BackendKind::Uinput),
            DisplayServer::X11 | DisplayServer::Windows | DisplayServer::MacOs => {
                Some(BackendKind::Automation)
            }
            DisplayServer::Unknown => None,
        }
    }
}

impl std::fmt::Display for DisplayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayServer::Wayland => write!(f, "wayland"),
            DisplayServer::X11 => write!(f, "x11"),
            DisplayServer::Windows => write!(f, "windows"),
            DisplayServer::MacOs => write!(f, "macos"),
            DisplayServer::Unknown => write!(f, "unknown"),
        }
    }
}

/// Backend selection from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Pick from the display environment
    Auto,
    /// Kernel virtual input device
    Uinput,
    /// Host automation library
    Automation,
}

impl BackendKind {
    /// Names accepted in configuration
    pub const NAMES: [&'static str; 3] = ["auto", "uinput", "automation"];

    /// Parse a configured backend name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "uinput" => Some(Self::Uinput),
            "automation" => Some(Self::Automation),
            _ => None,
        }
    }
}

/// Create the pointer backend for this host
///
/// `Auto` consults [`DisplayServer::detect`]; explicit kinds skip detection.
pub fn create_backend(kind: BackendKind, device_name: &str) -> Result<Arc<dyn PointerBackend>> {
    let kind = match kind {
        BackendKind::Auto => {
            let server = DisplayServer::detect();
            info!("Detected display server: {}", server);
            server
                .preferred_backend()
                .ok_or_else(|| PointerError::UnsupportedDisplayServer(server.to_string()))?
        }
        explicit => {
            warn!("Pointer backend forced to {:?} by configuration", explicit);
            explicit
        }
    };

    match kind {
        BackendKind::Uinput => {
            info!("Using uinput backend");
            open_uinput(device_name)
        }
        _ => {
            info!("Using automation backend");
            Ok(Arc::new(AutomationPointer::new()?))
        }
    }
}

#[cfg(target_os = "linux")]
fn open_uinput(device_name: &str) -> Result<Arc<dyn PointerBackend>> {
    Ok(Arc::new(UinputPointer::new(device_name)?))
}

#[cfg(not(target_os = "linux"))]
fn open_uinput(_device_name: &str) -> Result<Arc<dyn PointerBackend>> {
    Err(PointerError::Unsupported("uinput"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wayland_session_type_selects_uinput() {
        let ds = DisplayServer::from_env("linux", Some("wayland"), None, Some(":0"));
        assert_eq!(ds, DisplayServer::Wayland);
        assert_eq!(ds.preferred_backend(), Some(BackendKind::Uinput));
    }

    #[test]
    fn test_wayland_display_without_x11_selects_uinput() {
        let ds = DisplayServer::from_env("linux", None, Some("wayland-0"), None);
        assert_eq!(ds, DisplayServer::Wayland);
    }

    #[test]
    fn test_xwayland_display_falls_back_to_x11() {
        // Both sockets present and no session type: the X11 path wins
        let ds = DisplayServer::from_env("linux", Some("tty"), Some("wayland-0"), Some(":0"));
        assert_eq!(ds, DisplayServer::X11);
        assert_eq!(ds.preferred_backend(), Some(BackendKind::Automation));
    }

    #[test]
    fn test_x11_session() {
        assert_eq!(
            DisplayServer::from_env("linux", Some("x11"), None, None),
            DisplayServer::X11
        );
        assert_eq!(
            DisplayServer::from_env("linux", None, None, Some(":1")),
            DisplayServer::X11
        );
    }

    #[test]
    fn test_empty_variables_count_as_unset() {
        let ds = DisplayServer::from_env("linux", Some(""), Some(""), Some(""));
        assert_eq!(ds, DisplayServer::Unknown);
        assert_eq!(ds.preferred_backend(), None);
    }

    #[test]
    fn test_desktop_platforms_use_automation() {
        for os in ["windows", "macos"] {
            let ds = DisplayServer::from_env(os, None, None, None);
            assert_eq!(ds.preferred_backend(), Some(BackendKind::Automation));
        }
        assert_eq!(
            DisplayServer::from_env("freebsd", None, None, Some(":0")),
            DisplayServer::Unknown
        );
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(BackendKind::parse("auto"), Some(BackendKind::Auto));
        assert_eq!(BackendKind::parse("UINPUT"), Some(BackendKind::Uinput));
        assert_eq!(BackendKind::parse("automation"), Some(BackendKind::Automation));
        assert_eq!(BackendKind::parse("robotgo"), None);
    }

    #[test]
    fn test_linux_button_codes() {
        assert_eq!(MouseButton::Left.to_linux_button(), 0x110);
        assert_eq!(MouseButton::Right.to_linux_button(), 0x111);
        assert_eq!(MouseButton::Middle.to_linux_button(), 0x112);
    }
}
