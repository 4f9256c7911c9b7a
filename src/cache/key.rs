//! Cache key construction — stable hashing of a tool call's semantic inputs.
//! Sha2 over a canonical byte stream.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Fields excluded from the semantic hash: already present in the key
/// (`user_id`), or request plumbing rather than query identity.
const EXCLUDED_FIELDS: &[&str] = &["user_id", "force_refresh"];

/// `"<tool_name>:<user_id>:<hash>"`. Parameter order is irrelevant and
/// `None`/`{}` hash identically because the params are canonicalized
/// (keys sorted, nulls and excluded fields dropped) before hashing.
pub fn build(tool_name: &str, user_id: &str, params: &Value) -> String {
    let canonical = canonicalize(params);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hasher.finalize();
    format!("{tool_name}:{user_id}:{hash:x}")
}

fn canonicalize(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> =
                map.iter().filter(|(k, v)| !EXCLUDED_FIELDS.contains(&k.as_str()) && !v.is_null()).collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries.iter().map(|(k, v)| format!("{k}={}", canonicalize(v))).collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", body.join(","))
        }
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_stable_under_field_reordering() {
        let a = json!({"asset_id": "a1", "days_back": 7});
        let b = json!({"days_back": 7, "asset_id": "a1"});
        assert_eq!(build("oee", "u1", &a), build("oee", "u1", &b));
    }

    #[test]
    fn none_and_empty_object_hash_identically() {
        let none = Value::Null;
        let empty = json!({});
        assert_eq!(build("assets", "u1", &none), build("assets", "u1", &empty));
    }

    #[test]
    fn excluded_fields_do_not_affect_hash() {
        let with_flag = json!({"asset_id": "a1", "force_refresh": true, "user_id": "ignored"});
        let without_flag = json!({"asset_id": "a1"});
        assert_eq!(build("oee", "u1", &with_flag), build("oee", "u1", &without_flag));
    }

    #[test]
    fn different_inputs_hash_differently() {
        let a = json!({"asset_id": "a1"});
        let b = json!({"asset_id": "a2"});
        assert_ne!(build("oee", "u1", &a), build("oee", "u1", &b));
    }
}
