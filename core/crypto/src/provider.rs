//! Cipher provider trait and ciphertext layout descriptions.

use std::fmt;
use zeroize::Zeroizing;

use crate::keys::CipherKey;
use resivault_common::{Error, Result};

/// One segment of a ciphertext's byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSegment {
    /// Initialization vector / nonce of a fixed length.
    Iv { len: usize },
    /// Encrypted payload whose length is a multiple of `multiple_of`.
    Payload { multiple_of: usize },
    /// Authentication tag of a fixed length.
    Tag { len: usize },
}

impl fmt::Display for LayoutSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutSegment::Iv { len } => write!(f, "iv[len={}B]", len),
            LayoutSegment::Payload { multiple_of } => {
                write!(f, "payload[multipleOf={}B]", multiple_of)
            }
            LayoutSegment::Tag { len } => write!(f, "tag[len={}B]", len),
        }
    }
}

/// Ordered description of how a provider lays out its ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptotextLayout(Vec<LayoutSegment>);

impl CryptotextLayout {
    pub fn new(segments: Vec<LayoutSegment>) -> Self {
        Self(segments)
    }

    /// Smallest possible ciphertext length (fixed segments only).
    pub fn overhead(&self) -> usize {
        self.0
            .iter()
            .map(|segment| match segment {
                LayoutSegment::Iv { len } | LayoutSegment::Tag { len } => *len,
                LayoutSegment::Payload { .. } => 0,
            })
            .sum()
    }
}

impl fmt::Display for CryptotextLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// A symmetric cipher that can be plugged into an encryptor/decryptor.
///
/// Providers are stateless; the key is passed on every call.
pub trait CipherProvider: Send + Sync {
    /// Stable algorithm name, e.g. "aes-128-gcm".
    fn name(&self) -> &'static str;

    /// Required key length in bytes.
    fn key_bytes(&self) -> usize;

    /// Generate a random key of the right length for this provider.
    fn generate_key(&self) -> CipherKey {
        CipherKey::generate(self.key_bytes())
    }

    /// Encrypt `plaintext` under `key`.
    ///
    /// # Errors
    /// - `Error::Crypto` if the key has the wrong length or the input is not
    ///   acceptable to the algorithm
    fn encrypt(&self, plaintext: &[u8], key: &CipherKey) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext` under `key`.
    ///
    /// # Errors
    /// - `Error::Crypto` if the key has the wrong length
    /// - `Error::CryptoFailure` on authentication failure or malformed input
    fn decrypt(&self, ciphertext: &[u8], key: &CipherKey) -> Result<Zeroizing<Vec<u8>>>;

    /// Describe the byte layout of ciphertexts produced by this provider.
    fn describe_layout(&self) -> CryptotextLayout;
}

/// Reject keys whose length does not match the provider.
pub(crate) fn check_key_length(provider: &str, expected: usize, key: &CipherKey) -> Result<()> {
    if key.len() != expected {
        return Err(Error::Crypto(format!(
            "Invalid key length for {}: expected {}, got {}",
            provider,
            expected,
            key.len()
        )));
    }
    Ok(())
}
