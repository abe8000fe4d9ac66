//! Chunk metadata cleanup

use serde_json::Value;

use crate::Metadata;

/// Copy `metadata` without the keys whose value is `null` or an empty string.
///
/// Every other entry is kept as is, including `0`, `false` and
/// whitespace-only strings.
pub fn sanitize_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(_, value)| !is_empty_value(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn metadata(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_removes_null_and_empty_strings() {
        let raw = metadata(json!({
            "source": "relatorio.pdf",
            "page": 0,
            "title": "",
            "author": null,
            "total_pages": 12,
        }));

        let clean = sanitize_metadata(&raw);
        assert_eq!(
            clean,
            metadata(json!({"source": "relatorio.pdf", "page": 0, "total_pages": 12}))
        );
    }

    #[test]
    fn test_keeps_falsy_scalars() {
        let raw = metadata(json!({"page": 0, "encrypted": false, "subject": " "}));
        assert_eq!(sanitize_metadata(&raw), raw);
    }

    #[test]
    fn test_empty_map() {
        assert!(sanitize_metadata(&Metadata::new()).is_empty());
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            Just(Value::String(String::new())),
            "[a-z ]{0,6}".prop_map(Value::String),
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::Bool),
        ]
    }

    proptest! {
        #[test]
        fn prop_sanitized_is_non_empty_subset(
            entries in proptest::collection::btree_map("[a-z_]{1,10}", scalar(), 0..12)
        ) {
            let raw: Metadata = entries.into_iter().collect();
            let clean = sanitize_metadata(&raw);

            for (key, value) in &clean {
                prop_assert!(!is_empty_value(value));
                prop_assert_eq!(raw.get(key), Some(value));
            }
            for (key, value) in &raw {
                if !is_empty_value(value) {
                    prop_assert_eq!(clean.get(key), Some(value));
                }
            }
        }
    }
}
