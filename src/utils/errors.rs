//! User-Friendly Error Formatting
//!
//! Provides user-friendly error messages with troubleshooting hints
//! for common startup failures.

use std::fmt::Write;

use crate::pointer::PointerError;

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    // Header
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    // Match against the whole chain, context layers hide the root message
    let error_msg = format!("{:#}", error);

    if is_device_permission_error(error) {
        format_uinput_error(&mut output);
    } else if error_msg.contains("display server") || error_msg.contains("automation") {
        format_backend_error(&mut output, &error_msg);
    } else if error_msg.contains("TLS")
        || error_msg.contains("certificate")
        || error_msg.contains("Certificate")
        || error_msg.contains("private key")
    {
        format_tls_error(&mut output);
    } else if error_msg.contains("bind") || error_msg.contains("address") {
        format_network_error(&mut output);
    } else if error_msg.contains("config") {
        format_config_error(&mut output);
    } else {
        format_generic_error(&mut output, &error_msg);
    }

    // Technical details
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    // Footer with help
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: quick-mouse -vv"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Or set RUST_LOG=quick_mouse=trace to see every packet"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn is_device_permission_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<PointerError>()
            .is_some_and(PointerError::is_permission_problem)
    })
}

fn format_uinput_error(output: &mut String) {
    writeln!(output, "Virtual Input Device Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not open /dev/uinput to create the virtual mouse.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. uinput module not loaded").ok();
    writeln!(output, "     → Run: sudo modprobe uinput").ok();
    writeln!(
        output,
        "     → Persist: echo uinput | sudo tee /etc/modules-load.d/uinput.conf"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  2. No permission to write /dev/uinput").ok();
    writeln!(output, "     → Run: sudo usermod -aG input $USER").ok();
    writeln!(output, "     → Log out and log back in").ok();
    writeln!(output, "     → Check: ls -l /dev/uinput").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Not on a Wayland session").ok();
    writeln!(output, "     → X11 sessions can use: --backend automation").ok();
}

fn format_backend_error(output: &mut String, error: &str) {
    writeln!(output, "Pointer Backend Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not create a virtual pointer for this desktop.").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
    writeln!(output).ok();
    writeln!(output, "Troubleshooting:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Check which session you are running:").ok();
    writeln!(output, "     → echo $XDG_SESSION_TYPE").ok();
    writeln!(output, "     → echo $WAYLAND_DISPLAY $DISPLAY").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Pick a backend explicitly:").ok();
    writeln!(output, "     → Wayland (Linux): --backend uinput").ok();
    writeln!(output, "     → X11 / Windows / macOS: --backend automation").ok();
    writeln!(output).ok();
    writeln!(output, "  3. The automation backend is a cargo feature").ok();
    writeln!(output, "     → Build with: cargo build --features automation").ok();
}

fn format_tls_error(output: &mut String) {
    writeln!(output, "TLS Certificate Error").ok();
    writeln!(output).ok();
    writeln!(
        output,
        "Could not load TLS certificates. Phones only share motion data over HTTPS."
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Certificate files not found").ok();
    writeln!(output, "     → Check [security] paths in config.toml").ok();
    writeln!(
        output,
        "     → Default: certs/localhost.pem and certs/localhost-key.pem"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  2. Need to generate certificates").ok();
    writeln!(output, "     → With mkcert: mkcert -install").ok();
    writeln!(
        output,
        "       mkcert -cert-file certs/localhost.pem -key-file certs/localhost-key.pem localhost <LAN-IP>"
    )
    .ok();
    writeln!(output, "     → Or manually:").ok();
    writeln!(
        output,
        "       openssl req -x509 -newkey rsa:4096 -nodes \\"
    )
    .ok();
    writeln!(
        output,
        "         -keyout certs/localhost-key.pem -out certs/localhost.pem \\"
    )
    .ok();
    writeln!(output, "         -days 365 -subj '/CN=quick-mouse'").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Invalid certificate format").ok();
    writeln!(output, "     → Certificates must be PEM format").ok();
    writeln!(
        output,
        "     → Check file starts with '-----BEGIN CERTIFICATE-----'"
    )
    .ok();
}

fn format_network_error(output: &mut String) {
    writeln!(output, "Network Binding Error").ok();
    writeln!(output).ok();
    writeln!(
        output,
        "Could not bind to the network address for phone connections."
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Port 3000 already in use").ok();
    writeln!(output, "     → Check: sudo ss -tlnp | grep 3000").ok();
    writeln!(output, "     → Stop the other process or use --port 3443").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Permission denied (port < 1024)").ok();
    writeln!(output, "     → Use port >= 1024").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Invalid listen address").ok();
    writeln!(output, "     → Check config.toml: listen_addr format").ok();
    writeln!(output, "     → Should be: 'IP:PORT' like '0.0.0.0:3000'").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Out-of-range physics values").ok();
    writeln!(output, "     → friction must be between 0 and 1").ok();
    writeln!(
        output,
        "     → max_velocity, move_scale and tick_interval_ms must be positive"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  3. Wrong file").ok();
    writeln!(output, "     → Specify: quick-mouse -c /path/to/config.toml").ok();
    writeln!(output, "     → See config.toml.example for reference").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Server Error").ok();
    writeln!(output).ok();
    writeln!(output, "An error occurred while running the server.").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_format_user_error() {
        let error = anyhow::anyhow!("something odd happened");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("Server Error"));
        assert!(formatted.contains("something odd happened"));
    }

    #[test]
    fn test_uinput_permission_error_formatting() {
        let source = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let error = Err::<(), _>(PointerError::DevicePermission { source })
            .context("Failed to create pointer backend")
            .unwrap_err();

        let formatted = format_user_error(&error);
        assert!(formatted.contains("Virtual Input Device Error"));
        assert!(formatted.contains("modprobe uinput"));
        assert!(formatted.contains("usermod -aG input"));
    }

    #[test]
    fn test_tls_error_formatting() {
        let error = anyhow::anyhow!("No certificates found in \"certs/localhost.pem\"")
            .context("Failed to initialize TLS");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("TLS Certificate Error"));
        assert!(formatted.contains("mkcert"));
    }

    #[test]
    fn test_bind_error_formatting() {
        let error = anyhow::anyhow!("Address already in use").context("Failed to bind 0.0.0.0:3000");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("Network Binding Error"));
    }

    #[test]
    fn test_backend_error_formatting() {
        let error = anyhow::Error::new(PointerError::UnsupportedDisplayServer("unknown".into()));
        let formatted = format_user_error(&error);
        assert!(formatted.contains("Pointer Backend Error"));
        assert!(formatted.contains("--backend"));
    }
}
