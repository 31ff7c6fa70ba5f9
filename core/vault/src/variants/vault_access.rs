//! `VaultAccess`: how to open this vault. Only used by the root entry.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::registry::Registry;
use crate::tag::Tag;
use crate::usage::UsageKind;
use resivault_common::{Error, Result};
use resivault_crypto::Salt;

pub const TYPE: &str = "VaultAccess";

/// Typed view of the details payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultAccess {
    pub vault_id: String,
    pub kdf: String,
    pub salt_base64: String,
}

impl VaultAccess {
    pub fn new(vault_id: impl Into<String>, kdf: impl Into<String>, salt: &Salt) -> Self {
        Self {
            vault_id: vault_id.into(),
            kdf: kdf.into(),
            salt_base64: BASE64.encode(salt.as_bytes()),
        }
    }

    /// Read the typed view back out of validated details.
    pub fn from_details(details: &Value) -> Result<Self> {
        serde_json::from_value(details.clone())
            .map_err(|e| Error::RootEntryMalformed(format!("Invalid VaultAccess details: {}", e)))
    }

    /// Decode the stored KDF salt.
    ///
    /// # Errors
    /// - `RootEntryMalformed` if the salt is not valid base64
    pub fn salt(&self) -> Result<Salt> {
        BASE64
            .decode(&self.salt_base64)
            .map(Salt::from_bytes)
            .map_err(|e| Error::RootEntryMalformed(format!("Salt is not valid base64: {}", e)))
    }
}

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "vaultId": { "type": "string" },
            "kdf": { "type": "string" },
            "saltBase64": { "type": "string", "format": "base64" }
        },
        "required": ["vaultId", "kdf", "saltBase64"],
        "additionalProperties": false
    })
}

pub(crate) fn auto_tags(_details: &Value) -> Vec<Tag> {
    Vec::new()
}

pub fn register(registry: &mut Registry) -> Result<()> {
    registry.register_usage(UsageKind::VaultAccess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    #[test]
    fn test_details_shape() {
        let access = VaultAccess::new("v-1", "scrypt-v1", &Salt::from_bytes(vec![0, 1, 2]));
        let details = serde_json::to_value(&access).unwrap();

        assert_eq!(
            details,
            json!({ "vaultId": "v-1", "kdf": "scrypt-v1", "saltBase64": "AAEC" })
        );
        assert!(Schema::compile(schema()).unwrap().validate(&details).is_ok());
        assert_eq!(VaultAccess::from_details(&details).unwrap(), access);
    }

    #[test]
    fn test_bad_salt_is_malformed_root() {
        let access = VaultAccess {
            vault_id: "v".to_string(),
            kdf: "scrypt-v1".to_string(),
            salt_base64: "!!".to_string(),
        };
        assert!(matches!(access.salt(), Err(Error::RootEntryMalformed(_))));
    }
}
