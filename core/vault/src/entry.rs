//! Vault entries and their persisted envelope.

use serde::{Deserialize, Serialize};

use crate::registry::Registry;
use crate::secret::{Secret, SecretEnvelope};
use crate::tag::Tag;
use crate::usage::{Usage, UsageEnvelope};
use resivault_common::{Error, Result};

/// Persisted form of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryEnvelope {
    pub id: String,
    pub name: String,
    pub tags: Vec<Tag>,
    pub usage: UsageEnvelope,
    pub secrets: Vec<SecretEnvelope>,
}

/// A single item in the vault and the unit of persistence.
///
/// Entries are encrypted as a whole at rest. After loading, each secret
/// stays sealed and is only decrypted on demand.
///
/// Secret labels are unique within an entry. [`Entry::add_secret`] enforces
/// this; entries decoded from storage are taken as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    id: String,
    name: String,
    tags: Vec<Tag>,
    usage: Usage,
    secrets: Vec<Secret>,
}

impl Entry {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        tags: Vec<Tag>,
        usage: Usage,
        secrets: Vec<Secret>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags,
            usage,
            secrets,
        }
    }

    /// Fresh random entry id.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit tags, in insertion order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    pub fn secrets(&self) -> &[Secret] {
        &self.secrets
    }

    pub fn secret_labels(&self) -> Vec<&str> {
        self.secrets.iter().map(Secret::label).collect()
    }

    pub fn get_secret(&self, label: &str) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.label() == label)
    }

    /// Attach a secret.
    ///
    /// # Errors
    /// - `SecretLabelAlreadyExists` if the label is taken; the entry is
    ///   left unchanged
    pub fn add_secret(&mut self, secret: Secret) -> Result<()> {
        if self.get_secret(secret.label()).is_some() {
            return Err(Error::SecretLabelAlreadyExists(secret.label().to_string()));
        }
        self.secrets.push(secret);
        Ok(())
    }

    /// Detach and return the secret with `label`.
    pub fn delete_secret(&mut self, label: &str) -> Result<Secret> {
        let index = self
            .secrets
            .iter()
            .position(|s| s.label() == label)
            .ok_or_else(|| Error::SecretNotFound(label.to_string()))?;
        Ok(self.secrets.remove(index))
    }

    pub fn auto_tags(&self) -> Vec<Tag> {
        self.usage.auto_tags()
    }

    /// Explicit tags followed by derived ones.
    pub fn all_tags(&self) -> Vec<Tag> {
        let mut tags = self.tags.clone();
        tags.extend(self.auto_tags());
        tags
    }

    pub fn to_envelope(&self) -> EntryEnvelope {
        EntryEnvelope {
            id: self.id.clone(),
            name: self.name.clone(),
            tags: self.tags.clone(),
            usage: self.usage.to_envelope(),
            secrets: self.secrets.iter().map(Secret::to_envelope).collect(),
        }
    }

    /// Rebuild an entry, resolving every type tag through `registry`.
    ///
    /// # Errors
    /// - `UsageTypeNotSupported` / `SecretTypeNotSupported` for unknown tags
    /// - `SchemaViolation` if the usage details do not validate
    pub fn from_envelope(envelope: EntryEnvelope, registry: &Registry) -> Result<Self> {
        let usage = Usage::from_envelope(envelope.usage, registry)?;
        let secrets = envelope
            .secrets
            .into_iter()
            .map(|s| Secret::from_envelope(s, registry))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: envelope.id,
            name: envelope.name,
            tags: envelope.tags,
            usage,
            secrets,
        })
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(&self.to_envelope())?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn from_json_bytes(bytes: &[u8], registry: &Registry) -> Result<Self> {
        let envelope: EntryEnvelope = serde_json::from_slice(bytes)?;
        Self::from_envelope(envelope, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use resivault_crypto::{Aes128GcmSiv, CipherProvider, ZeroizingCipher};
    use serde_json::json;
    use std::sync::Arc;

    fn cipher() -> ZeroizingCipher {
        let provider: Arc<dyn CipherProvider> = Arc::new(Aes128GcmSiv);
        ZeroizingCipher::new(provider.clone(), provider.generate_key())
    }

    fn password(registry: &Registry, cipher: &ZeroizingCipher, label: &str) -> Secret {
        registry
            .secret("Password")
            .unwrap()
            .seal(label, &json!("pw"), cipher)
            .unwrap()
    }

    fn sample() -> Entry {
        Entry::new(
            "e-1",
            "Example",
            vec![Tag::new("team", "ops")],
            Usage::web_login(
                &Registry::with_builtin_variants().unwrap(),
                "https://example.com/login",
                "alice",
            )
            .unwrap(),
            vec![],
        )
    }

    #[test]
    fn test_add_secret_rejects_duplicate_label() {
        let registry = Registry::with_builtin_variants().unwrap();
        let cipher = cipher();
        let mut entry = sample();

        entry.add_secret(password(&registry, &cipher, "main")).unwrap();
        let before = entry.clone();

        let result = entry.add_secret(password(&registry, &cipher, "main"));
        assert!(matches!(result, Err(Error::SecretLabelAlreadyExists(l)) if l == "main"));
        assert_eq!(entry, before);
    }

    #[test]
    fn test_delete_secret() {
        let registry = Registry::with_builtin_variants().unwrap();
        let cipher = cipher();
        let mut entry = sample();
        entry.add_secret(password(&registry, &cipher, "a")).unwrap();
        entry.add_secret(password(&registry, &cipher, "b")).unwrap();

        let removed = entry.delete_secret("a").unwrap();
        assert_eq!(removed.label(), "a");
        assert_eq!(entry.secret_labels(), vec!["b"]);
        assert!(matches!(entry.delete_secret("a"), Err(Error::SecretNotFound(_))));
    }

    #[test]
    fn test_all_tags() {
        let tags = sample().all_tags();
        assert_eq!(
            tags,
            vec![Tag::new("team", "ops"), Tag::new("domain", "example.com")]
        );
    }

    #[test]
    fn test_json_layout() {
        let bytes = sample().to_json_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.ends_with("}\n"));
        assert!(text.contains("\n  \"name\": \"Example\""));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["usage"]["type"], "WebLogin");
        assert_eq!(value["tags"][0], json!({ "key": "team", "value": "ops" }));
    }

    #[test]
    fn test_generate_id_is_unique() {
        assert_ne!(Entry::generate_id(), Entry::generate_id());
    }

    proptest! {
        #[test]
        fn prop_labels_stay_unique(labels in proptest::collection::vec("[a-c]{1,2}", 0..12)) {
            let registry = Registry::with_builtin_variants().unwrap();
            let cipher = cipher();
            let mut entry = sample();

            for label in &labels {
                let _ = entry.add_secret(password(&registry, &cipher, label));
            }

            let mut seen = entry.secret_labels();
            let total = seen.len();
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), total);
        }

        #[test]
        fn prop_envelope_roundtrip(
            name in ".{0,24}",
            tags in proptest::collection::vec(("[a-z]{1,8}", ".{0,16}"), 0..4),
            labels in proptest::collection::btree_set("[a-z]{1,8}", 0..4),
        ) {
            let registry = Registry::with_builtin_variants().unwrap();
            let cipher = cipher();
            let mut entry = Entry::new(
                Entry::generate_id(),
                name,
                tags.into_iter().map(|(k, v)| Tag::new(k, v)).collect(),
                Usage::web_login(&registry, "https://example.org", "user").unwrap(),
                vec![],
            );
            for label in &labels {
                entry.add_secret(password(&registry, &cipher, label)).unwrap();
            }

            let restored = Entry::from_json_bytes(&entry.to_json_bytes().unwrap(), &registry).unwrap();
            prop_assert_eq!(restored, entry);
        }
    }
}
