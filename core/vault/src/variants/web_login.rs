//! `WebLogin`: credentials for a web site.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::registry::Registry;
use crate::tag::Tag;
use crate::usage::UsageKind;
use resivault_common::Result;

pub const TYPE: &str = "WebLogin";

/// Typed view of the details payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebLogin {
    pub url: String,
    pub username: String,
}

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "url": { "type": "string", "format": "uri" },
            "username": { "type": "string" }
        },
        "required": ["url", "username"],
        "additionalProperties": false
    })
}

/// A `domain` tag taken from the URL host. Unparseable or host-less URLs
/// yield no tags.
pub(crate) fn auto_tags(details: &Value) -> Vec<Tag> {
    details
        .get("url")
        .and_then(Value::as_str)
        .and_then(|raw| url::Url::parse(raw).ok())
        .and_then(|url| url.host_str().map(|host| Tag::new("domain", host)))
        .into_iter()
        .collect()
}

pub fn register(registry: &mut Registry) -> Result<()> {
    registry.register_usage(UsageKind::WebLogin)
}
