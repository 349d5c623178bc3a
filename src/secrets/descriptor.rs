//! Secret descriptor grammar shared by all backends.
//!
//! A descriptor looks like `encrypted:<backend>!k1:v1!k2:v2`. The text between the marker
//! and the first `!` selects the backend; the remaining `!`-separated segments are
//! `key:value` pairs whose meaning belongs to that backend.

use crate::errors::{Error, Result};

/// Marker prefix identifying a secret descriptor in a configuration value.
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

const MARKER_KEY: &str = "encrypted";

/// Whether a configuration string is a secret descriptor.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Backend name of a descriptor, e.g. `vault` for `encrypted:vault!e:secret!...`.
pub fn backend_name(descriptor: &str) -> Result<&str> {
    let rest = descriptor
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| Error::syntax(descriptor, "missing 'encrypted:' marker"))?;

    let name = rest.split('!').next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(Error::syntax(descriptor, "missing secret backend name"));
    }
    Ok(name)
}

/// Split a descriptor into its `key:value` pairs, skipping the `encrypted` marker pair.
///
/// Fails when there are fewer than two `!`-separated segments or a segment has no `:`.
/// Values are split on the first `:` only, so they may contain colons.
pub fn parse_pairs(descriptor: &str) -> Result<Vec<(&str, &str)>> {
    let segments: Vec<&str> = descriptor.split('!').collect();
    if segments.len() < 2 {
        return Err(Error::syntax(descriptor, "illegal format"));
    }

    let mut pairs = Vec::with_capacity(segments.len() - 1);
    for segment in segments {
        let (key, value) = segment.split_once(':').ok_or_else(|| {
            Error::syntax(descriptor, format!("illegal format for key-value pair: {}", segment))
        })?;
        if key == MARKER_KEY {
            continue;
        }
        pairs.push((key, value));
    }
    Ok(pairs)
}
