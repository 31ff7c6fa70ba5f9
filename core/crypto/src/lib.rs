//! Cryptographic primitives for resivault.
//!
//! This module provides:
//! - Pluggable cipher providers: AES-128 AEADs (OCB, GCM, GCM-SIV) for entry
//!   and secret encryption,
//!   an RFC 3394 key wrap for data-encryption-keys, and a no-op provider for
//!   non-secret metadata
//! - Password-based key derivation using scrypt
//! - Zeroizing encryptor/decryptor that scrub plaintext buffers on every path
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - Decrypted plaintext only lives inside a caller-supplied closure
//! - No plaintext or key material is ever logged

pub mod aead;
pub mod encdec;
pub mod kdf;
pub mod keys;
pub mod keywrap;
pub mod plaintext;
pub mod provider;

pub use aead::{Aes128Gcm, Aes128GcmSiv, Aes128Ocb};
pub use encdec::{Decryptor, Encryptor, ZeroizingCipher};
pub use kdf::{DerivedKey, ScryptKdfV1};
pub use keys::{CipherKey, Salt};
pub use keywrap::Aes256KeyWrap;
pub use plaintext::PlaintextForMetadataOnly;
pub use provider::{CipherProvider, CryptotextLayout, LayoutSegment};
