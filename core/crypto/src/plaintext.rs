//! Identity "cipher" for structural metadata that needs no confidentiality.
//!
//! Used only for the root entry's repository: the envelope shape is public,
//! while the keys inside it are wrapped separately.

use zeroize::Zeroizing;

use crate::keys::CipherKey;
use crate::provider::{check_key_length, CipherProvider, CryptotextLayout, LayoutSegment};
use resivault_common::Result;

/// No-op provider with a zero-length key.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextForMetadataOnly;

impl CipherProvider for PlaintextForMetadataOnly {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    fn key_bytes(&self) -> usize {
        0
    }

    fn encrypt(&self, plaintext: &[u8], key: &CipherKey) -> Result<Vec<u8>> {
        check_key_length(self.name(), 0, key)?;
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8], key: &CipherKey) -> Result<Zeroizing<Vec<u8>>> {
        check_key_length(self.name(), 0, key)?;
        Ok(Zeroizing::new(ciphertext.to_vec()))
    }

    fn describe_layout(&self) -> CryptotextLayout {
        CryptotextLayout::new(vec![LayoutSegment::Payload { multiple_of: 1 }])
    }
}
