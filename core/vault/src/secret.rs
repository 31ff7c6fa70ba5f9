//! Sealed secret values.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use zeroize::Zeroizing;

use crate::registry::Registry;
use crate::variants::{encryption_key, password};
use resivault_common::{Error, Result};
use resivault_crypto::Decryptor;

/// Compiled-in secret variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKind {
    Password,
    EncryptionKey,
}

impl SecretKind {
    /// Persisted type tag.
    pub fn tag(&self) -> &'static str {
        match self {
            SecretKind::Password => password::TYPE,
            SecretKind::EncryptionKey => encryption_key::TYPE,
        }
    }

    /// Schema document for values of this variant.
    pub fn schema(&self) -> Value {
        match self {
            SecretKind::Password => password::schema(),
            SecretKind::EncryptionKey => encryption_key::schema(),
        }
    }

    /// Serialize a validated value into the bytes that get encrypted.
    pub(crate) fn encode(&self, value: &Value) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            SecretKind::Password => password::encode(value),
            SecretKind::EncryptionKey => encryption_key::encode(value),
        }
    }

    /// Inverse of [`encode`](Self::encode); the result is re-validated by the caller.
    pub(crate) fn decode(&self, plaintext: &[u8]) -> Result<Value> {
        match self {
            SecretKind::Password => password::decode(plaintext),
            SecretKind::EncryptionKey => encryption_key::decode(plaintext),
        }
    }
}

/// Persisted form of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretEnvelope {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub label: String,
    /// Base64 of the ciphertext.
    pub encrypted_value: String,
}

/// A labeled, encrypted value.
///
/// Only a sealer produces the ciphertext and only a revealer
/// ([`Secret::reveal`]) consumes it. The plaintext never lives on this struct.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    kind: SecretKind,
    label: String,
    encrypted_value: Vec<u8>,
}

impl Secret {
    pub(crate) fn new(kind: SecretKind, label: String, encrypted_value: Vec<u8>) -> Self {
        Self {
            kind,
            label,
            encrypted_value,
        }
    }

    pub fn kind(&self) -> SecretKind {
        self.kind
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn encrypted_value(&self) -> &[u8] {
        &self.encrypted_value
    }

    /// Decrypt and re-validate the value with the registered variant.
    ///
    /// # Errors
    /// - `SecretTypeNotSupported` if this variant is not in `registry`
    /// - `CryptoFailure` if the decryptor's key does not match
    /// - `SchemaViolation` / `Serialization` if the plaintext is not a valid
    ///   value of this variant
    pub fn reveal<D: Decryptor>(&self, registry: &Registry, decryptor: &D) -> Result<Value> {
        registry.secret(self.type_tag())?.reveal(self, decryptor)
    }

    pub fn to_envelope(&self) -> SecretEnvelope {
        SecretEnvelope {
            type_tag: self.type_tag().to_string(),
            label: self.label.clone(),
            encrypted_value: BASE64.encode(&self.encrypted_value),
        }
    }

    /// Rebuild a secret from its persisted form.
    ///
    /// # Errors
    /// - `SecretTypeNotSupported` if the type tag is not registered
    /// - `Serialization` if the ciphertext is not valid base64
    pub fn from_envelope(envelope: SecretEnvelope, registry: &Registry) -> Result<Self> {
        let variant = registry.secret(&envelope.type_tag)?;
        let encrypted_value = BASE64.decode(&envelope.encrypted_value).map_err(|e| {
            Error::Serialization(format!(
                "Secret {} has invalid encryptedValue: {}",
                envelope.label, e
            ))
        })?;
        Ok(Self::new(variant.kind(), envelope.label, encrypted_value))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("type", &self.type_tag())
            .field("label", &self.label)
            .field("encrypted_len", &self.encrypted_value.len())
            .finish()
    }
}
