use quick_mouse::config::Config;
use quick_mouse::security::{AuthKey, SecurityContext, TlsConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_self_signed(dir: &Path) -> (PathBuf, PathBuf) {
    let cert_path = dir.join("localhost.pem");
    let key_path = dir.join("localhost-key.pem");

    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    std::fs::write(&cert_path, cert.serialize_pem().unwrap()).unwrap();
    std::fs::write(&key_path, cert.serialize_private_key_pem()).unwrap();

    (cert_path, key_path)
}

#[test]
fn test_certificate_loading() {
    let temp_dir = TempDir::new().unwrap();
    let (cert_path, key_path) = write_self_signed(temp_dir.path());

    let tls_config = TlsConfig::from_files(&cert_path, &key_path).unwrap();

    assert_eq!(tls_config.certificates().len(), 1);
    assert_eq!(
        tls_config.server_config().alpn_protocols,
        vec![b"http/1.1".to_vec()]
    );
}

#[test]
fn test_key_file_without_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    let (cert_path, _) = write_self_signed(temp_dir.path());

    // A certificate is not a private key
    let err = TlsConfig::from_files(&cert_path, &cert_path).err().unwrap();
    assert!(err.to_string().contains("No private key found"));
}

#[test]
fn test_security_context_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let (cert_path, key_path) = write_self_signed(temp_dir.path());

    let mut config = Config::default_config().unwrap();
    config.security.cert_path = cert_path;
    config.security.key_path = key_path;

    let first = SecurityContext::new(&config).unwrap();
    let second = SecurityContext::new(&config).unwrap();

    assert_eq!(first.auth_key().as_str().len(), 32);
    // Every start gets a fresh key
    assert_ne!(first.auth_key(), second.auth_key());
}

#[test]
fn test_auth_key_verification() {
    let key = AuthKey::from_hex("00112233445566778899aabbccddeeff");

    assert!(key.verify("00112233445566778899aabbccddeeff"));
    assert!(!key.verify(""));
    assert!(!key.verify("00112233445566778899AABBCCDDEEFF"));
    assert!(!key.verify("00112233445566778899aabbccddeef"));
}

#[test]
fn test_auth_key_is_not_logged() {
    let key = AuthKey::generate();
    let debug = format!("{:?}", key);
    assert!(!debug.contains(key.as_str()));
}
