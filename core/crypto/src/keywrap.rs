//! AES-256 key wrap (RFC 3394) for protecting data-encryption-keys.
//!
//! The wrapped form is `iv (8 bytes) || payload`, with no separate tag. The
//! IV is the fixed RFC 3394 constant, so wrapping the same key twice under the
//! same KEK yields the same bytes. Only ever use this for high-entropy key
//! material.

use aes_kw::KekAes256;
use zeroize::Zeroizing;

use crate::keys::CipherKey;
use crate::provider::{check_key_length, CipherProvider, CryptotextLayout, LayoutSegment};
use resivault_common::{Error, Result};

/// Semiblock size of the key-wrap algorithm.
pub const SEMIBLOCK_SIZE: usize = 8;

/// KEK size (256-bit).
pub const KEK_SIZE: usize = 32;

/// AES-256 key wrap provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256KeyWrap;

impl Aes256KeyWrap {
    fn kek(&self, key: &CipherKey) -> Result<KekAes256> {
        check_key_length(self.name(), KEK_SIZE, key)?;
        KekAes256::try_from(key.as_bytes())
            .map_err(|e| Error::Crypto(format!("Invalid key-encryption-key: {}", e)))
    }
}

impl CipherProvider for Aes256KeyWrap {
    fn name(&self) -> &'static str {
        "aes-256-kw"
    }

    fn key_bytes(&self) -> usize {
        KEK_SIZE
    }

    fn encrypt(&self, plaintext: &[u8], key: &CipherKey) -> Result<Vec<u8>> {
        if plaintext.len() < 2 * SEMIBLOCK_SIZE || plaintext.len() % SEMIBLOCK_SIZE != 0 {
            return Err(Error::Crypto(format!(
                "Key wrap input must be a multiple of {} bytes and at least {} bytes, got {}",
                SEMIBLOCK_SIZE,
                2 * SEMIBLOCK_SIZE,
                plaintext.len()
            )));
        }

        self.kek(key)?
            .wrap_vec(plaintext)
            .map_err(|e| Error::Crypto(format!("Key wrap failed: {}", e)))
    }

    fn decrypt(&self, ciphertext: &[u8], key: &CipherKey) -> Result<Zeroizing<Vec<u8>>> {
        let kek = self.kek(key)?;
        let out_len = ciphertext
            .len()
            .checked_sub(SEMIBLOCK_SIZE)
            .ok_or(Error::CryptoFailure)?;

        // Allocated zeroizing up front: a failed integrity check leaves
        // unwrapped bytes in the buffer.
        let mut out = Zeroizing::new(vec![0u8; out_len]);
        kek.unwrap(ciphertext, &mut out[..])
            .map_err(|_| Error::CryptoFailure)?;
        Ok(out)
    }

    fn describe_layout(&self) -> CryptotextLayout {
        CryptotextLayout::new(vec![
            LayoutSegment::Iv {
                len: SEMIBLOCK_SIZE,
            },
            LayoutSegment::Payload {
                multiple_of: SEMIBLOCK_SIZE,
            },
        ])
    }
}
