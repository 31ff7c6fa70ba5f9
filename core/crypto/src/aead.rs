//! Authenticated encryption with 128-bit AES keys.
//!
//! Three interchangeable providers share one layout:
//! `iv (12 bytes) || payload || tag (16 bytes)`, with a fresh random IV for
//! every encryption.

use aes_gcm::aead::{consts::U12, Aead, AeadCore, KeyInit, Nonce, OsRng};
use aes_gcm::Aes128Gcm as GcmCipher;
use aes_gcm_siv::Aes128GcmSiv as GcmSivCipher;
use ocb3::Ocb3;
use zeroize::Zeroizing;

use crate::keys::CipherKey;
use crate::provider::{check_key_length, CipherProvider, CryptotextLayout, LayoutSegment};
use resivault_common::{Error, Result};

/// IV (nonce) size, 96 bits.
pub const IV_SIZE: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// AES key size (128-bit).
pub const KEY_SIZE: usize = 16;

/// AES block size.
pub const BLOCK_SIZE: usize = 16;

fn seal<C>(name: &str, key: &CipherKey, plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: Aead + AeadCore<NonceSize = U12> + KeyInit,
{
    check_key_length(name, KEY_SIZE, key)?;

    let cipher = C::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Crypto(format!("Invalid key for {}: {}", name, e)))?;
    let iv = C::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&iv, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    // Prepend IV; the AEAD already appended the tag
    let mut result = Vec::with_capacity(IV_SIZE + ciphertext.len());
    result.extend_from_slice(&iv);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

fn open<C>(name: &str, key: &CipherKey, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>
where
    C: Aead + AeadCore<NonceSize = U12> + KeyInit,
{
    check_key_length(name, KEY_SIZE, key)?;

    if ciphertext.len() < IV_SIZE + TAG_SIZE {
        return Err(Error::CryptoFailure);
    }

    let (iv, encrypted) = ciphertext.split_at(IV_SIZE);
    let iv = Nonce::<C>::from_slice(iv);

    let cipher = C::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Crypto(format!("Invalid key for {}: {}", name, e)))?;

    cipher
        .decrypt(iv, encrypted)
        .map(Zeroizing::new)
        .map_err(|_| Error::CryptoFailure)
}

fn aead_layout() -> CryptotextLayout {
    CryptotextLayout::new(vec![
        LayoutSegment::Iv { len: IV_SIZE },
        LayoutSegment::Payload {
            multiple_of: BLOCK_SIZE,
        },
        LayoutSegment::Tag { len: TAG_SIZE },
    ])
}

/// AES-128 in Galois/Counter Mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes128Gcm;

impl CipherProvider for Aes128Gcm {
    fn name(&self) -> &'static str {
        "aes-128-gcm"
    }

    fn key_bytes(&self) -> usize {
        KEY_SIZE
    }

    fn encrypt(&self, plaintext: &[u8], key: &CipherKey) -> Result<Vec<u8>> {
        seal::<GcmCipher>(self.name(), key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &CipherKey) -> Result<Zeroizing<Vec<u8>>> {
        open::<GcmCipher>(self.name(), key, ciphertext)
    }

    fn describe_layout(&self) -> CryptotextLayout {
        aead_layout()
    }
}

/// AES-128 in OCB3 mode (RFC 7253), 96-bit nonce and 128-bit tag.
///
/// The vault's default for both entry and secret encryption.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes128Ocb;

type OcbCipher = Ocb3<aes::Aes128>;

impl CipherProvider for Aes128Ocb {
    fn name(&self) -> &'static str {
        "aes-128-ocb"
    }

    fn key_bytes(&self) -> usize {
        KEY_SIZE
    }

    fn encrypt(&self, plaintext: &[u8], key: &CipherKey) -> Result<Vec<u8>> {
        seal::<OcbCipher>(self.name(), key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &CipherKey) -> Result<Zeroizing<Vec<u8>>> {
        open::<OcbCipher>(self.name(), key, ciphertext)
    }

    fn describe_layout(&self) -> CryptotextLayout {
        aead_layout()
    }
}

/// AES-128 in nonce-misuse-resistant GCM-SIV mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes128GcmSiv;

impl CipherProvider for Aes128GcmSiv {
    fn name(&self) -> &'static str {
        "aes-128-gcm-siv"
    }

    fn key_bytes(&self) -> usize {
        KEY_SIZE
    }

    fn encrypt(&self, plaintext: &[u8], key: &CipherKey) -> Result<Vec<u8>> {
        seal::<GcmSivCipher>(self.name(), key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &CipherKey) -> Result<Zeroizing<Vec<u8>>> {
        open::<GcmSivCipher>(self.name(), key, ciphertext)
    }

    fn describe_layout(&self) -> CryptotextLayout {
        aead_layout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn providers() -> Vec<Box<dyn CipherProvider>> {
        vec![Box::new(Aes128Gcm), Box::new(Aes128Ocb), Box::new(Aes128GcmSiv)]
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for provider in providers() {
            let key = provider.generate_key();
            let plaintext = b"Hello, World!";

            let ciphertext = provider.encrypt(plaintext, &key).unwrap();
            let decrypted = provider.decrypt(&ciphertext, &key).unwrap();

            assert_eq!(decrypted.as_slice(), plaintext, "{}", provider.name());
        }
    }

    #[test]
    fn test_ciphertext_size() {
        for provider in providers() {
            let key = provider.generate_key();
            let plaintext = b"Test message";

            let ciphertext = provider.encrypt(plaintext, &key).unwrap();

            // Size should be iv + plaintext + tag
            assert_eq!(ciphertext.len(), IV_SIZE + plaintext.len() + TAG_SIZE);
            assert_eq!(provider.describe_layout().overhead(), IV_SIZE + TAG_SIZE);
        }
    }

    #[test]
    fn test_different_iv_each_time() {
        let key = Aes128Gcm.generate_key();
        let plaintext = b"Same plaintext";

        let ct1 = Aes128Gcm.encrypt(plaintext, &key).unwrap();
        let ct2 = Aes128Gcm.encrypt(plaintext, &key).unwrap();

        assert_ne!(&ct1[..IV_SIZE], &ct2[..IV_SIZE]);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_wrong_key_fails() {
        for provider in providers() {
            let key1 = provider.generate_key();
            let key2 = provider.generate_key();

            let ciphertext = provider.encrypt(b"Secret data", &key1).unwrap();
            let result = provider.decrypt(&ciphertext, &key2);

            assert!(matches!(result, Err(Error::CryptoFailure)));
        }
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        for provider in providers() {
            let key = provider.generate_key();
            let mut ciphertext = provider.encrypt(b"Important data", &key).unwrap();
            ciphertext[IV_SIZE + 5] ^= 0xFF;

            assert!(matches!(
                provider.decrypt(&ciphertext, &key),
                Err(Error::CryptoFailure)
            ));
        }
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let key = Aes128Gcm.generate_key();
        let result = Aes128Gcm.decrypt(&[0u8; IV_SIZE + TAG_SIZE - 1], &key);
        assert!(matches!(result, Err(Error::CryptoFailure)));
    }

    #[test]
    fn test_invalid_key_length() {
        let long_key = CipherKey::from_slice(&[0u8; 32]);
        assert!(matches!(
            Aes128Gcm.encrypt(b"data", &long_key),
            Err(Error::Crypto(_))
        ));
        assert!(matches!(
            Aes128GcmSiv.decrypt(&[0u8; 64], &long_key),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_providers_are_not_interchangeable_on_the_wire() {
        let key = Aes128Gcm.generate_key();
        let ciphertext = Aes128Gcm.encrypt(b"payload", &key).unwrap();
        assert!(Aes128GcmSiv.decrypt(&ciphertext, &key).is_err());
        assert!(Aes128Ocb.decrypt(&ciphertext, &key).is_err());

        let ciphertext = Aes128Ocb.encrypt(b"payload", &key).unwrap();
        assert!(Aes128Gcm.decrypt(&ciphertext, &key).is_err());
    }

    #[test]
    fn test_ocb_known_answer() {
        // RFC 7253 appendix A, first sample: empty AD and plaintext
        let key = CipherKey::from_slice(&[
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D,
            0x0E, 0x0F,
        ]);
        let mut ciphertext = vec![
            0xBB, 0xAA, 0x99, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00,
        ];
        ciphertext.extend_from_slice(&[
            0x78, 0x54, 0x07, 0xBF, 0xFF, 0xC8, 0xAD, 0x9E, 0xDC, 0xC5, 0x52, 0x0A, 0xC9, 0x11,
            0x1E, 0xE6,
        ]);

        let decrypted = Aes128Ocb.decrypt(&ciphertext, &key).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_empty_plaintext() {
        let key = Aes128GcmSiv.generate_key();
        let ciphertext = Aes128GcmSiv.encrypt(b"", &key).unwrap();
        let decrypted = Aes128GcmSiv.decrypt(&ciphertext, &key).unwrap();

        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_layout() {
        for provider in providers() {
            assert_eq!(
                provider.describe_layout().to_string(),
                "iv[len=12B] | payload[multipleOf=16B] | tag[len=16B]"
            );
        }
    }
}
