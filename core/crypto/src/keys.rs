//! Key types with secure memory handling.
//!
//! All key types automatically zeroize their memory on drop to prevent
//! sensitive data from persisting in memory.

use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of freshly generated KDF salts in bytes.
pub const SALT_LENGTH: usize = 16;

/// Raw symmetric key bound to no particular algorithm.
///
/// Providers check the length against their own requirement on every call.
/// The plaintext provider uses a zero-length key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    key: Vec<u8>,
}

impl CipherKey {
    /// Create a key from raw bytes, taking ownership of the buffer.
    pub fn from_bytes(key: Vec<u8>) -> Self {
        Self { key }
    }

    /// Copy a key out of a borrowed slice.
    pub fn from_slice(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }

    /// Generate a random key of `len` bytes.
    pub fn generate(len: usize) -> Self {
        let mut key = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.key.len()
    }

    /// Whether this is the empty key of the plaintext provider.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CipherKey([REDACTED; {} bytes])", self.key.len())
    }
}

/// Salt for key derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Self {
        let mut salt = vec![0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generate() {
        let key1 = CipherKey::generate(16);
        let key2 = CipherKey::generate(16);

        assert_eq!(key1.len(), 16);
        // Random keys should be different
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let key = CipherKey::from_slice(&[0xAB; 16]);
        let rendered = format!("{:?}", key);
        assert_eq!(rendered, "CipherKey([REDACTED; 16 bytes])");
        assert!(!rendered.contains("171"));
    }

    #[test]
    fn test_salt_generate() {
        let salt1 = Salt::generate();
        let salt2 = Salt::generate();

        assert_eq!(salt1.as_bytes().len(), SALT_LENGTH);
        assert_ne!(salt1.as_bytes(), salt2.as_bytes());
    }
}
