//! `EncryptionKey`: raw key bytes, exchanged as `{ "base64": ... }`.
//!
//! Unlike other secrets the sealed plaintext is the raw key, not its JSON
//! form, so a key-wrap cipher can process it directly. The vault's own data
//! keys go through [`seal_key`] and [`reveal_key`], which never render the
//! key as base64.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use zeroize::Zeroizing;

use crate::registry::Registry;
use crate::secret::{Secret, SecretKind};
use resivault_common::{Error, Result};
use resivault_crypto::{CipherKey, Decryptor, Encryptor};

pub const TYPE: &str = "EncryptionKey";

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "base64": { "type": "string", "format": "base64" }
        },
        "required": ["base64"],
        "additionalProperties": false
    })
}

pub(crate) fn encode(value: &Value) -> Result<Zeroizing<Vec<u8>>> {
    let encoded = value
        .get("base64")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::SchemaViolation("$.base64 must be a string".to_string()))?;
    BASE64
        .decode(encoded)
        .map(Zeroizing::new)
        .map_err(|e| Error::SchemaViolation(format!("$.base64 is not valid base64: {}", e)))
}

pub(crate) fn decode(plaintext: &[u8]) -> Result<Value> {
    Ok(json!({ "base64": BASE64.encode(plaintext) }))
}

/// Seal `key` as an `EncryptionKey` secret straight from its bytes.
///
/// # Errors
/// - `InvalidInput` if `label` is empty
/// - Whatever `encryptor` reports
pub fn seal_key(label: &str, key: &CipherKey, encryptor: &dyn Encryptor) -> Result<Secret> {
    if label.is_empty() {
        return Err(Error::InvalidInput("Secret label must not be empty".to_string()));
    }
    let mut raw = Zeroizing::new(key.as_bytes().to_vec());
    let encrypted = encryptor.encrypt(&mut raw)?;
    Ok(Secret::new(
        SecretKind::EncryptionKey,
        label.to_string(),
        encrypted,
    ))
}

/// Recover the key held by an `EncryptionKey` secret.
///
/// The plaintext only ever exists in the decryptor's scrubbed buffer and in
/// the returned key.
///
/// # Errors
/// - `InvalidInput` if `secret` is not an `EncryptionKey`
/// - `CryptoFailure` if decryption fails
pub fn reveal_key<D: Decryptor>(secret: &Secret, decryptor: &D) -> Result<CipherKey> {
    if secret.kind() != SecretKind::EncryptionKey {
        return Err(Error::InvalidInput(format!(
            "{} is a {}, not an {}",
            secret.label(),
            secret.type_tag(),
            TYPE
        )));
    }
    decryptor.decrypt(secret.encrypted_value(), |raw| Ok(CipherKey::from_slice(raw)))
}

pub fn register(registry: &mut Registry) -> Result<()> {
    registry.register_secret(SecretKind::EncryptionKey)
}
