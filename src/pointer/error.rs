//! Pointer Backend Error Types

use thiserror::Error;

/// Result type for pointer operations
pub type Result<T> = std::result::Result<T, PointerError>;

/// Pointer backend error types
#[derive(Error, Debug)]
pub enum PointerError {
    /// No backend exists for the detected display server
    #[error("unsupported display server: {0}")]
    UnsupportedDisplayServer(String),

    /// Backend is not available on this platform or build
    #[error("{0} backend is not supported on this platform")]
    Unsupported(&'static str),

    /// The process may not open /dev/uinput
    #[error(
        "failed to create uinput device: {source}\n\
         Make sure you have permissions. Run:\n  \
         sudo modprobe uinput\n  \
         sudo usermod -aG input $USER\n\
         Then log out and back in."
    )]
    DevicePermission {
        /// Underlying open error
        #[source]
        source: std::io::Error,
    },

    /// Kernel device setup or event write failed
    #[error("uinput device error: {0}")]
    Device(String),

    /// Host automation library failure
    #[error("automation backend error: {0}")]
    Automation(String),

    /// Backend worker thread is gone
    #[error("pointer worker is not running")]
    WorkerGone,

    /// Backend has been closed
    #[error("pointer backend is closed")]
    Closed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PointerError {
    /// Whether the failure needs user action before the server can start
    pub fn is_permission_problem(&self) -> bool {
        match self {
            PointerError::DevicePermission { .. } => true,
            PointerError::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_message_has_instructions() {
        let err = PointerError::DevicePermission {
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let msg = err.to_string();
        assert!(msg.contains("modprobe uinput"));
        assert!(msg.contains("usermod -aG input"));
        assert!(err.is_permission_problem());
    }

    #[test]
    fn test_unsupported_display_server_message() {
        let err = PointerError::UnsupportedDisplayServer("unknown".to_string());
        assert_eq!(err.to_string(), "unsupported display server: unknown");
        assert!(!err.is_permission_problem());
    }
}
