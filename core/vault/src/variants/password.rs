//! `Password`: a single string, sealed as canonical JSON.

use serde_json::{json, Value};
use zeroize::Zeroizing;

use crate::registry::Registry;
use crate::secret::SecretKind;
use resivault_common::Result;

pub const TYPE: &str = "Password";

pub fn schema() -> Value {
    json!({ "type": "string" })
}

pub(crate) fn encode(value: &Value) -> Result<Zeroizing<Vec<u8>>> {
    Ok(Zeroizing::new(serde_json::to_vec(value)?))
}

pub(crate) fn decode(plaintext: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(plaintext)?)
}

pub fn register(registry: &mut Registry) -> Result<()> {
    registry.register_secret(SecretKind::Password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encoding_is_json() {
        let encoded = encode(&json!("p@ss \"quoted\"")).unwrap();
        assert_eq!(encoded.as_slice(), br#""p@ss \"quoted\"""#);
        assert_eq!(decode(&encoded).unwrap(), json!("p@ss \"quoted\""));
    }
}
