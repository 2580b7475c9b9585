//! Session auth key
//!
//! A fresh 128-bit key is generated at every start and handed to the phone
//! inside the connection URL. The first WebSocket frame must echo it back.

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Key length in bytes before hex encoding
pub const AUTH_KEY_BYTES: usize = 16;

/// Shared secret the client must present in its `auth` packet
#[derive(Clone, PartialEq, Eq)]
pub struct AuthKey(String);

impl AuthKey {
    /// Generate a random key from the OS RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; AUTH_KEY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a known key
    pub fn from_hex(hex_key: impl Into<String>) -> Self {
        Self(hex_key.into())
    }

    /// Lowercase hex form, as it appears in the connection URL
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare a presented key in constant time
    pub fn verify(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_format() {
        let key = AuthKey::generate();
        assert_eq!(key.as_str().len(), AUTH_KEY_BYTES * 2);
        assert!(key
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(AuthKey::generate(), AuthKey::generate());
    }

    #[test]
    fn test_verify() {
        let key = AuthKey::from_hex("00112233445566778899aabbccddeeff");
        assert!(key.verify("00112233445566778899aabbccddeeff"));
        assert!(!key.verify("00112233445566778899aabbccddeefe"));
        assert!(!key.verify("00112233"));
        assert!(!key.verify(""));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = AuthKey::from_hex("deadbeef");
        assert!(!format!("{:?}", key).contains("deadbeef"));
    }
}
