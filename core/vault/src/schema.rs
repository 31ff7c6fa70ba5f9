//! JSON Schema documents for variant payloads.
//!
//! Every secret and usage variant describes the shape of its plaintext or
//! details with a Draft 7 document. The registry compiles each document once
//! when the variant is registered; values are checked on the way in
//! (sealing, construction) and on the way out (reveal, envelope decoding).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use resivault_common::{Error, Result};

/// A schema document together with its compiled validator.
#[derive(Clone)]
pub struct Schema {
    document: Value,
    compiled: Arc<JSONSchema>,
}

impl Schema {
    /// Compile `document` as a Draft 7 schema.
    ///
    /// Besides the draft's own formats, `"format": "base64"` accepts standard
    /// padded base64.
    ///
    /// # Errors
    /// - `InvalidInput` if `document` is not a valid schema
    pub fn compile(document: Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .with_format("base64", is_base64)
            .compile(&document)
            .map_err(|e| Error::InvalidInput(format!("Failed to compile schema: {}", e)))?;

        Ok(Self {
            document,
            compiled: Arc::new(compiled),
        })
    }

    /// The schema as it was written.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Check `value` against this schema.
    ///
    /// # Errors
    /// - `SchemaViolation` listing every failing location
    pub fn validate(&self, value: &Value) -> Result<()> {
        if let Err(errors) = self.compiled.validate(value) {
            let messages: Vec<String> = errors
                .map(|e| format!("{}: {}", location(&e.instance_path.to_string()), e))
                .collect();
            return Err(Error::SchemaViolation(messages.join("; ")));
        }
        Ok(())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("document", &self.document)
            .finish()
    }
}

fn is_base64(value: &str) -> bool {
    BASE64.decode(value).is_ok()
}

/// `/a/b` → `$.a.b`, with the document root as `$`.
fn location(pointer: &str) -> String {
    let mut path = String::from("$");
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        path.push('.');
        path.push_str(segment);
    }
    path
}
