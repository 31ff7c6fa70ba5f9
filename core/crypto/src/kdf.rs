//! Password-based key derivation using scrypt.
//!
//! The password is NFC-normalized before derivation so that visually
//! identical passwords typed on different platforms derive the same key.

use scrypt::Params;
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use crate::keys::{CipherKey, Salt};
use resivault_common::{Error, Result};

/// log2 of the scrypt work factor N.
pub const SCRYPT_LOG_N: u8 = 14;
/// scrypt block size r.
pub const SCRYPT_R: u32 = 8;
/// scrypt parallelization p.
pub const SCRYPT_P: u32 = 1;
/// Upper bound on scrypt's working memory.
pub const SCRYPT_MAX_MEMORY: usize = 32 * 1024 * 1024;

/// A freshly derived key together with the salt that produced it.
#[derive(Debug)]
pub struct DerivedKey {
    pub key: CipherKey,
    pub salt: Salt,
}

/// Version 1 of the password KDF: scrypt with fixed cost parameters.
///
/// The name returned by [`ScryptKdfV1::name`] is persisted next to the salt.
/// Opening a vault compares it for exact equality; supporting several KDF
/// versions would need a migration path rather than a looser check.
#[derive(Debug, Clone)]
pub struct ScryptKdfV1 {
    log_n: u8,
    r: u32,
    p: u32,
}

impl ScryptKdfV1 {
    /// Persisted identifier of this KDF version.
    pub const NAME: &'static str = "scrypt-v1";

    pub fn new() -> Self {
        Self {
            log_n: SCRYPT_LOG_N,
            r: SCRYPT_R,
            p: SCRYPT_P,
        }
    }

    /// Version string stored alongside the salt.
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Derive a key from `password` with a newly generated salt.
    ///
    /// # Errors
    /// - `PasswordNotProvided` if the password is empty
    /// - `Crypto` if `key_bytes` is zero
    pub fn derive_new_key(&self, password: &str, key_bytes: usize) -> Result<DerivedKey> {
        let salt = Salt::generate();
        let key = self.derive_key(password, &salt, key_bytes)?;
        Ok(DerivedKey { key, salt })
    }

    /// Deterministically re-derive a key from `password` and a stored salt.
    ///
    /// # Preconditions
    /// - `password` must not be empty
    ///
    /// # Postconditions
    /// - The same password, salt and length always yield the same key
    ///
    /// # Security
    /// - The normalized password copy is zeroized after use
    pub fn derive_key(&self, password: &str, salt: &Salt, key_bytes: usize) -> Result<CipherKey> {
        if password.is_empty() {
            return Err(Error::PasswordNotProvided);
        }
        if key_bytes == 0 {
            return Err(Error::Crypto("Derived key length must be non-zero".to_string()));
        }

        let memory = 128usize
            .saturating_mul(self.r as usize)
            .saturating_mul(1usize << self.log_n);
        if memory > SCRYPT_MAX_MEMORY {
            return Err(Error::Crypto(format!(
                "scrypt parameters need {} bytes, above the {} byte ceiling",
                memory, SCRYPT_MAX_MEMORY
            )));
        }

        // The len parameter only matters for PHC strings; output length
        // comes from the buffer.
        let params = Params::new(self.log_n, self.r, self.p, Params::RECOMMENDED_LEN)
            .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))?;

        let normalized: Zeroizing<String> = Zeroizing::new(password.nfc().collect());
        let mut key_bytes_buf = Zeroizing::new(vec![0u8; key_bytes]);
        scrypt::scrypt(
            normalized.as_bytes(),
            salt.as_bytes(),
            &params,
            &mut key_bytes_buf[..],
        )
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))?;

        Ok(CipherKey::from_slice(&key_bytes_buf))
    }
}

impl Default for ScryptKdfV1 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let kdf = ScryptKdfV1::new();
        let salt = Salt::from_bytes(vec![42u8; 16]);

        let key1 = kdf.derive_key("test-password-123", &salt, 32).unwrap();
        let key2 = kdf.derive_key("test-password-123", &salt, 32).unwrap();

        assert_eq!(key1.len(), 32);
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_new_key_matches_rederivation() {
        let kdf = ScryptKdfV1::new();
        let derived = kdf.derive_new_key("hunter2", 32).unwrap();
        let again = kdf.derive_key("hunter2", &derived.salt, 32).unwrap();

        assert_eq!(derived.key.as_bytes(), again.as_bytes());
    }

    #[test]
    fn test_derive_key_different_salt() {
        let kdf = ScryptKdfV1::new();
        let key1 = kdf
            .derive_key("password", &Salt::from_bytes(vec![1u8; 16]), 32)
            .unwrap();
        let key2 = kdf
            .derive_key("password", &Salt::from_bytes(vec![2u8; 16]), 32)
            .unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_password() {
        let kdf = ScryptKdfV1::new();
        let salt = Salt::from_bytes(vec![42u8; 16]);

        let key1 = kdf.derive_key("password1", &salt, 32).unwrap();
        let key2 = kdf.derive_key("password2", &salt, 32).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_password_is_nfc_normalized() {
        let kdf = ScryptKdfV1::new();
        let salt = Salt::from_bytes(vec![9u8; 16]);

        // "é" precomposed vs. "e" + combining acute accent
        let composed = kdf.derive_key("caf\u{00e9}", &salt, 32).unwrap();
        let decomposed = kdf.derive_key("cafe\u{0301}", &salt, 32).unwrap();

        assert_eq!(composed.as_bytes(), decomposed.as_bytes());
    }

    #[test]
    fn test_empty_password_fails() {
        let kdf = ScryptKdfV1::new();
        assert!(matches!(
            kdf.derive_new_key("", 32),
            Err(Error::PasswordNotProvided)
        ));
    }

    #[test]
    fn test_name_is_stable() {
        assert_eq!(ScryptKdfV1::new().name(), "scrypt-v1");
    }
}
