//! Configuration tree and dotted-path addressing.

use serde_json::Value;
use std::collections::HashMap;

/// A parsed configuration document: string keys to nested values, insertion ordered.
pub type Tree = serde_json::Map<String, Value>;

/// Environment overrides consulted when a placeholder has no value in the tree.
pub type Env = HashMap<String, String>;

/// Look up a dotted path such as `services.fiat.baseUrl`.
///
/// Each segment descends one mapping key. A numeric segment indexes into a sequence.
pub fn lookup<'a>(tree: &'a Tree, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = tree.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Join a parent location and a child key into a dotted path.
pub(crate) fn child_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}
