//! Utility Functions and Diagnostics
//!
//! Startup diagnostics and user-friendly error formatting.
//!
//! ## Diagnostics
//!
//! [`log_startup_diagnostics`] logs the host, the desktop session variables
//! and the display server the automatic backend selection will see:
//!
//! ```rust,no_run
//! quick_mouse::utils::log_startup_diagnostics();
//! // === Desktop Session ===
//! //   XDG_SESSION_TYPE: wayland
//! //   Display server: wayland
//! //   Auto backend: Uinput
//! ```
//!
//! ## Error Formatting
//!
//! [`format_user_error`] renders fatal startup errors in a box with
//! troubleshooting steps:
//! - uinput permission errors → modprobe, input group membership
//! - backend errors → session type checks, `--backend`
//! - TLS errors → certificate paths, mkcert / openssl commands
//! - Network errors → port conflicts, listen address format
//! - Config errors → TOML syntax, physics ranges

pub mod diagnostics;
pub mod errors;

pub use diagnostics::{log_startup_diagnostics, SessionEnvironment, SystemInfo};
pub use errors::format_user_error;
