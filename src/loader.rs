//! YAML document loading.
//!
//! Documents are parsed with `serde_yaml` and converted into [`Tree`]s. Mapping keys that
//! YAML reads as booleans or numbers (`8080:`, `true:`) become their string form, and
//! tagged values are unwrapped to their content.

use crate::errors::{Error, Result};
use crate::tree::Tree;
use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse one YAML document. An empty document is an empty tree.
pub fn parse_yaml(text: &str) -> Result<Tree> {
    let document: YamlValue = serde_yaml::from_str(text)?;
    match convert(document)? {
        Value::Null => Ok(Tree::new()),
        Value::Object(map) => Ok(map),
        other => Err(Error::syntax(
            text.lines().next().unwrap_or_default(),
            format!("document root must be a mapping, found {}", kind(&other)),
        )),
    }
}

/// Read and parse a YAML file
pub fn load_file(path: impl AsRef<Path>) -> Result<Tree> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| Error::io(e, format!("Failed to read {}", path.display())))?;

    let tree = parse_yaml(&text).map_err(|e| match e {
        Error::Yaml(e) => Error::syntax(path.display().to_string(), e.to_string()),
        Error::Syntax { message, .. } => Error::syntax(path.display().to_string(), message),
        other => other,
    })?;
    debug!(path = %path.display(), keys = tree.len(), "Loaded configuration document");
    Ok(tree)
}

/// Load several files, preserving their order for merging
pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Tree>> {
    paths.iter().map(load_file).collect()
}

fn convert(value: YamlValue) -> Result<Value> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => convert_number(&n)?,
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => {
            Value::Array(items.into_iter().map(convert).collect::<Result<_>>()?)
        }
        YamlValue::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(convert_key(key)?, convert(value)?);
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => convert(tagged.value)?,
    })
}

fn convert_number(n: &serde_yaml::Number) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Value::from(u));
    }
    n.as_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| Error::syntax(n.to_string(), "non-finite numbers are not supported"))
}

fn convert_key(key: YamlValue) -> Result<String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Tagged(tagged) => convert_key(tagged.value),
        other => Err(Error::syntax(
            format!("{:?}", other),
            "mapping keys must be strings, booleans or numbers",
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
