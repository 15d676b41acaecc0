//! Default attribute normalizer: nested objects become dotted paths

use contracts::{Attributes, ContractError, NormalizedRecord, Normalizer};
use serde_json::Value;

/// Flattens `{"a": {"b": 1}}` into `{"a.b": 1}`
///
/// Scalars and arrays are kept as-is, empty objects vanish, and two
/// attributes landing on the same path reject the record.
#[derive(Debug, Clone)]
pub struct FlattenNormalizer {
    separator: String,
}

impl Default for FlattenNormalizer {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FlattenNormalizer {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    fn flatten_into(
        &self,
        out: &mut NormalizedRecord,
        record_id: &str,
        path: String,
        value: &Value,
    ) -> Result<(), ContractError> {
        match value {
            Value::Object(map) => {
                for (name, nested) in map {
                    let nested_path = format!("{path}{}{name}", self.separator);
                    self.flatten_into(out, record_id, nested_path, nested)?;
                }
            }
            other => {
                if out.contains(&path) {
                    return Err(ContractError::normalization(
                        record_id,
                        format!("attribute path '{path}' is defined more than once"),
                    ));
                }
                out.insert(path, other.clone());
            }
        }
        Ok(())
    }
}

impl Normalizer for FlattenNormalizer {
    fn normalize(
        &self,
        record_id: &str,
        attributes: &Attributes,
    ) -> Result<NormalizedRecord, ContractError> {
        let mut out = NormalizedRecord::new();
        for (name, value) in attributes {
            self.flatten_into(&mut out, record_id, name.clone(), value)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_flattens_nested_objects() {
        let normalized = FlattenNormalizer::default()
            .normalize(
                "u1",
                &attrs(json!({
                    "name": "ada",
                    "plan": { "tier": "pro", "limits": { "seats": 5 } }
                })),
            )
            .unwrap();

        assert_eq!(normalized.len(), 3);
        assert_eq!(normalized.get("name"), Some(&json!("ada")));
        assert_eq!(normalized.get("plan.tier"), Some(&json!("pro")));
        assert_eq!(normalized.get("plan.limits.seats"), Some(&json!(5)));
    }

    #[test]
    fn test_keeps_arrays_and_nulls() {
        let normalized = FlattenNormalizer::default()
            .normalize("u1", &attrs(json!({ "tags": [1, {"x": 2}], "gone": null })))
            .unwrap();

        assert_eq!(normalized.get("tags"), Some(&json!([1, {"x": 2}])));
        assert_eq!(normalized.get("gone"), Some(&Value::Null));
    }

    #[test]
    fn test_empty_object_vanishes() {
        let normalized = FlattenNormalizer::default()
            .normalize("u1", &attrs(json!({ "meta": {} })))
            .unwrap();
        assert!(normalized.is_empty());
    }

    #[test]
    fn test_colliding_paths_rejected() {
        let err = FlattenNormalizer::default()
            .normalize("u9", &attrs(json!({ "a.b": 1, "a": { "b": 2 } })))
            .unwrap_err();

        match err {
            ContractError::Normalization { record_id, message } => {
                assert_eq!(record_id, "u9");
                assert!(message.contains("a.b"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_custom_separator() {
        let normalized = FlattenNormalizer::new("_")
            .normalize("u1", &attrs(json!({ "a": { "b": true } })))
            .unwrap();
        assert_eq!(normalized.get("a_b"), Some(&json!(true)));
    }
}
