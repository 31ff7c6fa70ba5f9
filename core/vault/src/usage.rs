//! Usage context attached to every entry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::Registry;
use crate::tag::Tag;
use crate::variants::{vault_access, web_login, VaultAccess, WebLogin};
use resivault_common::Result;

/// Compiled-in usage variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageKind {
    WebLogin,
    VaultAccess,
}

impl UsageKind {
    /// Persisted type tag.
    pub fn tag(&self) -> &'static str {
        match self {
            UsageKind::WebLogin => web_login::TYPE,
            UsageKind::VaultAccess => vault_access::TYPE,
        }
    }

    /// Schema document for details of this variant.
    pub fn schema(&self) -> Value {
        match self {
            UsageKind::WebLogin => web_login::schema(),
            UsageKind::VaultAccess => vault_access::schema(),
        }
    }

    fn auto_tags(&self, details: &Value) -> Vec<Tag> {
        match self {
            UsageKind::WebLogin => web_login::auto_tags(details),
            UsageKind::VaultAccess => vault_access::auto_tags(details),
        }
    }
}

/// Persisted form of a usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEnvelope {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub details: Value,
}

/// Schema-validated, non-secret description of what an entry is for.
#[derive(Debug, Clone, PartialEq)]
pub struct Usage {
    kind: UsageKind,
    details: Value,
}

impl Usage {
    /// Build a usage of a registered variant.
    ///
    /// # Errors
    /// - `UsageTypeNotSupported` if `type_tag` is not registered
    /// - `SchemaViolation` if `details` does not match the variant's schema
    pub fn new(registry: &Registry, type_tag: &str, details: Value) -> Result<Self> {
        registry.usage(type_tag)?.construct(details)
    }

    pub(crate) fn from_validated(kind: UsageKind, details: Value) -> Self {
        Self { kind, details }
    }

    pub fn web_login(
        registry: &Registry,
        url: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self> {
        let details = serde_json::to_value(WebLogin {
            url: url.into(),
            username: username.into(),
        })?;
        Self::new(registry, web_login::TYPE, details)
    }

    pub fn vault_access(access: &VaultAccess) -> Result<Self> {
        let details = serde_json::to_value(access)?;
        Ok(Self::from_validated(UsageKind::VaultAccess, details))
    }

    pub fn kind(&self) -> UsageKind {
        self.kind
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn details(&self) -> &Value {
        &self.details
    }

    /// Tags derived from the details. Never fails; bad details give no tags.
    pub fn auto_tags(&self) -> Vec<Tag> {
        self.kind.auto_tags(&self.details)
    }

    pub fn to_envelope(&self) -> UsageEnvelope {
        UsageEnvelope {
            type_tag: self.type_tag().to_string(),
            details: self.details.clone(),
        }
    }

    pub fn from_envelope(envelope: UsageEnvelope, registry: &Registry) -> Result<Self> {
        Self::new(registry, &envelope.type_tag, envelope.details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resivault_common::Error;
    use serde_json::json;

    #[test]
    fn test_web_login_tags() {
        let registry = Registry::with_builtin_variants().unwrap();
        let usage = Usage::web_login(&registry, "https://example.com/signin", "alice").unwrap();
        assert_eq!(usage.type_tag(), "WebLogin");
        assert_eq!(usage.auto_tags(), vec![Tag::new("domain", "example.com")]);
    }

    #[test]
    fn test_web_login_requires_uri() {
        let registry = Registry::with_builtin_variants().unwrap();
        assert!(matches!(
            Usage::web_login(&registry, "example dot com", "alice"),
            Err(Error::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_envelope_roundtrip() {
        let registry = Registry::with_builtin_variants().unwrap();
        let usage = Usage::web_login(&registry, "https://example.com", "bob").unwrap();

        let restored = Usage::from_envelope(usage.to_envelope(), &registry).unwrap();
        assert_eq!(restored, usage);
    }

    #[test]
    fn test_unregistered_usage_fails_closed() {
        let registry = Registry::with_builtin_variants().unwrap();
        let envelope = UsageEnvelope {
            type_tag: "SshHost".to_string(),
            details: json!({}),
        };

        assert!(matches!(
            Usage::from_envelope(envelope, &registry),
            Err(Error::UsageTypeNotSupported(tag)) if tag == "SshHost"
        ));
    }

    #[test]
    fn test_envelope_details_are_validated() {
        let registry = Registry::with_builtin_variants().unwrap();
        let envelope = UsageEnvelope {
            type_tag: "WebLogin".to_string(),
            details: json!({ "url": "https://example.com" }),
        };

        assert!(matches!(
            Usage::from_envelope(envelope, &registry),
            Err(Error::SchemaViolation(_))
        ));
    }
}
