//! Registry of the secret and usage variants a process understands.
//!
//! Built once during startup, then shared read-only (usually behind an
//! `Arc`). Envelopes whose type tag is missing from the registry are
//! rejected rather than decoded into some default variant.

use serde_json::{json, Value};
use std::collections::HashMap;

use crate::schema::Schema;
use crate::secret::{Secret, SecretKind};
use crate::usage::{Usage, UsageKind};
use crate::variants::{encryption_key, password, vault_access, web_login};
use resivault_common::{Error, Result};
use resivault_crypto::{Decryptor, Encryptor};

/// Registered secret variant: its compiled schema, sealer and revealer.
#[derive(Debug, Clone)]
pub struct SecretVariant {
    kind: SecretKind,
    schema: Schema,
}

impl SecretVariant {
    pub fn kind(&self) -> SecretKind {
        self.kind
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validate `value`, serialize it and encrypt it into a new secret.
    ///
    /// # Postconditions
    /// - The serialized plaintext buffer is zeroized before returning
    ///
    /// # Errors
    /// - `InvalidInput` if `label` is empty
    /// - `SchemaViolation` if `value` does not match the schema
    /// - Whatever the encryptor reports
    pub fn seal(&self, label: &str, value: &Value, encryptor: &dyn Encryptor) -> Result<Secret> {
        if label.is_empty() {
            return Err(Error::InvalidInput("Secret label must not be empty".to_string()));
        }
        self.schema.validate(value)?;

        let mut plaintext = self.kind.encode(value)?;
        let encrypted_value = encryptor.encrypt(&mut plaintext[..])?;
        Ok(Secret::new(self.kind, label.to_string(), encrypted_value))
    }

    /// Decrypt `secret` and re-validate the value against this variant.
    ///
    /// # Errors
    /// - `SecretTypeNotSupported` if `secret` belongs to another variant
    /// - `CryptoFailure` if the decryptor's key does not match
    /// - `SchemaViolation` / `Serialization` if the plaintext is not a valid
    ///   value of this variant
    pub fn reveal<D: Decryptor>(&self, secret: &Secret, decryptor: &D) -> Result<Value> {
        if secret.kind() != self.kind {
            return Err(Error::SecretTypeNotSupported(secret.type_tag().to_string()));
        }
        let value = decryptor.decrypt(secret.encrypted_value(), |plain| self.kind.decode(plain))?;
        self.schema.validate(&value)?;
        Ok(value)
    }
}

/// Registered usage variant.
#[derive(Debug, Clone)]
pub struct UsageVariant {
    kind: UsageKind,
    schema: Schema,
}

impl UsageVariant {
    pub fn kind(&self) -> UsageKind {
        self.kind
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validate `details` and wrap them in a usage.
    pub fn construct(&self, details: Value) -> Result<Usage> {
        self.schema.validate(&details)?;
        Ok(Usage::from_validated(self.kind, details))
    }
}

/// Type tag → variant tables for secrets and usages.
#[derive(Debug, Default)]
pub struct Registry {
    secrets: HashMap<&'static str, SecretVariant>,
    usages: HashMap<&'static str, UsageVariant>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every compiled-in variant.
    pub fn with_builtin_variants() -> Result<Self> {
        let mut registry = Self::new();
        password::register(&mut registry)?;
        encryption_key::register(&mut registry)?;
        web_login::register(&mut registry)?;
        vault_access::register(&mut registry)?;
        Ok(registry)
    }

    /// Register a secret variant.
    ///
    /// The variant's schema is compiled here, once.
    ///
    /// # Errors
    /// - `AlreadyExists` if its type tag is already taken
    /// - `InvalidInput` if its schema does not compile
    pub fn register_secret(&mut self, kind: SecretKind) -> Result<()> {
        if self.secrets.contains_key(kind.tag()) {
            return Err(Error::AlreadyExists(format!(
                "Secret type '{}' is already registered",
                kind.tag()
            )));
        }
        let schema = Schema::compile(kind.schema())?;
        self.secrets.insert(kind.tag(), SecretVariant { kind, schema });
        Ok(())
    }

    /// Register a usage variant.
    ///
    /// # Errors
    /// - `AlreadyExists` if its type tag is already taken
    /// - `InvalidInput` if its schema does not compile
    pub fn register_usage(&mut self, kind: UsageKind) -> Result<()> {
        if self.usages.contains_key(kind.tag()) {
            return Err(Error::AlreadyExists(format!(
                "Usage type '{}' is already registered",
                kind.tag()
            )));
        }
        let schema = Schema::compile(kind.schema())?;
        self.usages.insert(kind.tag(), UsageVariant { kind, schema });
        Ok(())
    }

    /// Resolve a secret variant by tag.
    pub fn secret(&self, tag: &str) -> Result<&SecretVariant> {
        self.secrets
            .get(tag)
            .ok_or_else(|| Error::SecretTypeNotSupported(tag.to_string()))
    }

    /// Resolve a usage variant by tag.
    pub fn usage(&self, tag: &str) -> Result<&UsageVariant> {
        self.usages
            .get(tag)
            .ok_or_else(|| Error::UsageTypeNotSupported(tag.to_string()))
    }

    /// Registered secret tags, sorted.
    pub fn secret_types(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.secrets.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// Registered usage tags, sorted.
    pub fn usage_types(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.usages.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// `{ "secrets": { tag: schema }, "usages": { tag: schema } }`.
    pub fn describe(&self) -> Value {
        let secrets: serde_json::Map<String, Value> = self
            .secret_types()
            .into_iter()
            .filter_map(|tag| self.secrets.get(tag))
            .map(|v| (v.tag().to_string(), v.schema.document().clone()))
            .collect();
        let usages: serde_json::Map<String, Value> = self
            .usage_types()
            .into_iter()
            .filter_map(|tag| self.usages.get(tag))
            .map(|v| (v.tag().to_string(), v.schema.document().clone()))
            .collect();
        json!({ "secrets": secrets, "usages": usages })
    }
}
