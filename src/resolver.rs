//! End-to-end resolution: merge, placeholders, secret decryption.

use crate::errors::Result;
use crate::merge::merge;
use crate::placeholder::resolve_placeholders;
use crate::secrets::{
    is_encrypted, DecrypterFactory, DecrypterRegistry, SecretsConfig, VaultDecrypter,
    VAULT_BACKEND,
};
use crate::tree::{child_path, Env, Tree};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Merge `trees` in order, resolve placeholders against `env` and decrypt every secret
/// descriptor using the built-in backends.
pub async fn resolve(trees: &[Tree], env: &Env) -> Result<Tree> {
    Resolver::new().resolve(trees, env).await
}

/// Resolution pipeline with a configurable set of secret backends.
///
/// Backends registered here take precedence over the built-in ones. The Vault backend is
/// added per call, bound to the `secrets.vault` settings of the tree being resolved.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    registry: DecrypterRegistry,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: DecrypterRegistry) -> Self {
        Self { registry }
    }

    /// Add a secret backend
    pub fn register(mut self, name: impl Into<String>, factory: DecrypterFactory) -> Self {
        self.registry.register(name, factory);
        self
    }

    pub fn registry(&self) -> &DecrypterRegistry {
        &self.registry
    }

    pub async fn resolve(&self, trees: &[Tree], env: &Env) -> Result<Tree> {
        let merged = merge(trees);
        let mut resolved = resolve_placeholders(&merged, env)?;

        let config = Arc::new(SecretsConfig::from_tree(&resolved)?);
        let mut registry = self.registry.clone();
        registry.register_if_absent(VAULT_BACKEND, VaultDecrypter::factory(config));

        let decrypted = decrypt_tree(&mut resolved, &registry).await?;
        info!(documents = trees.len(), secrets = decrypted, "Resolved configuration");
        Ok(resolved)
    }
}

/// Replace every secret descriptor in `tree` with its plaintext.
///
/// Descriptors are decrypted one at a time in document order. The first failure aborts
/// the pass and names the location of the offending value. Returns the number of
/// values replaced.
pub async fn decrypt_tree(tree: &mut Tree, registry: &DecrypterRegistry) -> Result<usize> {
    let mut found = Vec::new();
    for (key, value) in tree.iter_mut() {
        collect_descriptors(key.clone(), value, &mut found);
    }

    let count = found.len();
    for (location, slot) in found {
        let Some(descriptor) = slot.as_str().map(str::to_string) else {
            continue;
        };
        debug!(location = %location, "Decrypting secret");

        let plaintext =
            decrypt_one(registry, &descriptor).await.map_err(|e| e.at_location(&location))?;

        *slot = Value::String(plaintext);
    }
    Ok(count)
}

async fn decrypt_one(registry: &DecrypterRegistry, descriptor: &str) -> Result<String> {
    let mut decrypter = registry.decrypter_for(descriptor)?;
    decrypter.decrypt().await
}

fn collect_descriptors<'a>(
    location: String,
    value: &'a mut Value,
    found: &mut Vec<(String, &'a mut Value)>,
) {
    if value.as_str().is_some_and(is_encrypted) {
        found.push((location, value));
        return;
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                collect_descriptors(child_path(&location, key), child, found);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter_mut().enumerate() {
                collect_descriptors(child_path(&location, &index.to_string()), child, found);
            }
        }
        _ => {}
    }
}
