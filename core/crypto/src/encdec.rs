//! Encryptor/decryptor pairs that scrub plaintext on every exit path.
//!
//! [`Encryptor::encrypt`] zero-fills the caller's plaintext buffer once the
//! ciphertext exists (or the attempt failed). [`Decryptor::decrypt`] hands the
//! plaintext to a closure and scrubs it as soon as the closure returns, so
//! plaintext never outlives the call.

use std::fmt;
use std::sync::Arc;
use zeroize::Zeroize;

use crate::keys::CipherKey;
use crate::provider::CipherProvider;
use resivault_common::Result;

/// Something that turns plaintext into ciphertext.
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext`, then overwrite it with zeros.
    ///
    /// # Postconditions
    /// - `plaintext` is all zeros, whether or not encryption succeeded
    fn encrypt(&self, plaintext: &mut [u8]) -> Result<Vec<u8>>;
}

/// Something that turns ciphertext back into plaintext for a bounded scope.
pub trait Decryptor: Send + Sync {
    /// Decrypt `ciphertext` and pass the plaintext to `consume` exactly once.
    ///
    /// # Postconditions
    /// - The plaintext buffer is zeroized before this returns, including when
    ///   `consume` fails
    ///
    /// # Errors
    /// - `CryptoFailure` if authentication fails (`consume` is not called)
    /// - Whatever `consume` returns
    fn decrypt<T, F>(&self, ciphertext: &[u8], consume: F) -> Result<T>
    where
        F: FnOnce(&[u8]) -> Result<T>;
}

/// Zero-fills the borrowed buffer when dropped, including during unwinding.
struct ScrubOnDrop<'a>(&'a mut [u8]);

impl Drop for ScrubOnDrop<'_> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Encryptor and decryptor bound to one provider and one key.
#[derive(Clone)]
pub struct ZeroizingCipher {
    provider: Arc<dyn CipherProvider>,
    key: CipherKey,
}

impl ZeroizingCipher {
    pub fn new(provider: Arc<dyn CipherProvider>, key: CipherKey) -> Self {
        Self { provider, key }
    }
}

impl Encryptor for ZeroizingCipher {
    fn encrypt(&self, plaintext: &mut [u8]) -> Result<Vec<u8>> {
        let guard = ScrubOnDrop(plaintext);
        self.provider.encrypt(guard.0, &self.key)
    }
}

impl Decryptor for ZeroizingCipher {
    fn decrypt<T, F>(&self, ciphertext: &[u8], consume: F) -> Result<T>
    where
        F: FnOnce(&[u8]) -> Result<T>,
    {
        let plaintext = self.provider.decrypt(ciphertext, &self.key)?;
        consume(&plaintext)
    }
}

impl fmt::Debug for ZeroizingCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZeroizingCipher")
            .field("algorithm", &self.provider.name())
            .field("key", &self.key)
            .finish()
    }
}
