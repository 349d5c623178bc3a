//! Deep merge of layered configuration documents.
//!
//! Later documents override earlier ones key by key at every depth. Mappings present on
//! both sides merge recursively; any other pairing (scalars, sequences, type mismatches)
//! is replaced outright by the later value.

use crate::tree::Tree;
use serde_json::Value;
use tracing::debug;

/// Merge `trees` in order into a new tree. Inputs are left untouched.
pub fn merge(trees: &[Tree]) -> Tree {
    let mut merged = Tree::new();
    for tree in trees {
        merge_into(&mut merged, tree);
    }
    debug!(documents = trees.len(), keys = merged.len(), "Merged configuration documents");
    merged
}

fn merge_into(target: &mut Tree, overlay: &Tree) {
    for (key, value) in overlay {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> Tree {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_merge_deep() {
        let base = tree(json!({"services": {"fiat": {"port": 7003, "enabled": false}}}));
        let overlay = tree(json!({"services": {"fiat": {"enabled": true}, "echo": {"port": 8089}}}));

        let merged = merge(&[base, overlay]);
        assert_eq!(
            Value::Object(merged),
            json!({"services": {"fiat": {"port": 7003, "enabled": true}, "echo": {"port": 8089}}})
        );
    }

    #[test]
    fn test_merge_replaces_sequences() {
        let base = tree(json!({"col": ["one", "two", "three"]}));
        let overlay = tree(json!({"col": ["four"]}));
        let merged = merge(&[base, overlay]);
        assert_eq!(merged["col"], json!(["four"]));
    }

    #[test]
    fn test_merge_type_mismatch_later_wins() {
        let base = tree(json!({"a": {"nested": 1}, "b": "scalar"}));
        let overlay = tree(json!({"a": "flat", "b": {"nested": 2}}));
        let merged = merge(&[base, overlay]);
        assert_eq!(merged["a"], json!("flat"));
        assert_eq!(merged["b"], json!({"nested": 2}));
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let base = tree(json!({"a": {"b": 1}}));
        let overlay = tree(json!({"a": {"c": 2}}));
        let inputs = vec![base.clone(), overlay.clone()];
        let _ = merge(&inputs);
        assert_eq!(inputs[0], base);
        assert_eq!(inputs[1], overlay);
    }

    #[test]
    fn test_merge_preserves_first_seen_order() {
        let base = tree(json!({"z": 1, "a": 2}));
        let overlay = tree(json!({"m": 3, "z": 4}));
        let merged = merge(&[base, overlay]);
        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge(&[]).is_empty());
    }
}
