//! Secret decrypter registry
//!
//! Maps a backend name (the `<backend>` in `encrypted:<backend>!...`) to the factory
//! that builds decrypters for it. New backends plug in here without touching the
//! resolution engine.

use super::config::SecretsConfig;
use super::decrypter::{Decrypter, DecrypterFactory};
use super::descriptor::backend_name;
use super::vault::{VaultDecrypter, VAULT_BACKEND};
use crate::errors::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of decrypter factories keyed by backend name
#[derive(Clone, Default)]
pub struct DecrypterRegistry {
    factories: HashMap<String, DecrypterFactory>,
}

impl std::fmt::Debug for DecrypterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecrypterRegistry").field("backends", &self.registered_backends()).finish()
    }
}

impl DecrypterRegistry {
    /// Create a new registry with no backends
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in backends bound to `config`
    pub fn with_defaults(config: Arc<SecretsConfig>) -> Self {
        let mut registry = Self::new();
        registry.register(VAULT_BACKEND, VaultDecrypter::factory(config));
        registry
    }

    /// Register a factory, replacing any previous one for the same backend
    pub fn register(&mut self, name: impl Into<String>, factory: DecrypterFactory) {
        let name = name.into();
        info!(backend = %name, "Registering secret decrypter");
        self.factories.insert(name, factory);
    }

    /// Register a factory unless the backend already has one
    pub fn register_if_absent(&mut self, name: impl Into<String>, factory: DecrypterFactory) {
        let name = name.into();
        if self.has_backend(&name) {
            debug!(backend = %name, "Keeping caller-registered secret decrypter");
            return;
        }
        self.register(name, factory);
    }

    /// Check if a backend is registered
    pub fn has_backend(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered backend names, sorted
    pub fn registered_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the decrypter responsible for `descriptor`
    pub fn decrypter_for(&self, descriptor: &str) -> Result<Box<dyn Decrypter>> {
        let name = backend_name(descriptor)?;
        let factory =
            self.factories.get(name).ok_or_else(|| Error::UnknownBackend(name.to_string()))?;
        Ok(factory(descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct EchoDecrypter {
        descriptor: String,
    }

    #[async_trait]
    impl Decrypter for EchoDecrypter {
        async fn decrypt(&mut self) -> Result<String> {
            Ok(self.descriptor.rsplit('!').next().unwrap_or_default().to_string())
        }
    }

    fn echo_factory() -> DecrypterFactory {
        Arc::new(|descriptor: &str| {
            Box::new(EchoDecrypter { descriptor: descriptor.to_string() }) as Box<dyn Decrypter>
        })
    }

    #[test]
    fn test_registry_creation() {
        let registry = DecrypterRegistry::new();
        assert!(registry.registered_backends().is_empty());
        assert!(!registry.has_backend("vault"));
    }

    #[test]
    fn test_with_defaults_registers_vault() {
        let registry = DecrypterRegistry::with_defaults(Arc::new(SecretsConfig::default()));
        assert!(registry.has_backend(VAULT_BACKEND));
        assert_eq!(registry.registered_backends(), vec!["vault".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_to_registered_backend() {
        let mut registry = DecrypterRegistry::new();
        registry.register("echo", echo_factory());

        let mut decrypter = registry.decrypter_for("encrypted:echo!v:plaintext").unwrap();
        assert_eq!(decrypter.decrypt().await.unwrap(), "v:plaintext");
    }

    #[test]
    fn test_unknown_backend_is_error() {
        let registry = DecrypterRegistry::with_defaults(Arc::new(SecretsConfig::default()));
        let err = registry.decrypter_for("encrypted:s3!b:bucket!f:file").unwrap_err();
        match err {
            Error::UnknownBackend(name) => assert_eq!(name, "s3"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_register_if_absent_keeps_existing() {
        let mut registry = DecrypterRegistry::new();
        registry.register(VAULT_BACKEND, echo_factory());
        registry.register_if_absent(
            VAULT_BACKEND,
            VaultDecrypter::factory(Arc::new(SecretsConfig::default())),
        );

        let decrypter = registry.decrypter_for("encrypted:vault!e:secret").unwrap();
        assert!(format!("{:?}", decrypter).contains("EchoDecrypter"));
    }

    #[test]
    fn test_registry_debug_lists_backends() {
        let mut registry = DecrypterRegistry::new();
        registry.register("echo", echo_factory());
        assert!(format!("{:?}", registry).contains("echo"));
    }
}
