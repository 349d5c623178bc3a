//! HashiCorp Vault secret backend
//!
//! Resolves descriptors of the form
//!
//! ```text
//! encrypted:vault!e:<engine>!n:<path>!k:<key>[!b:true]
//! ```
//!
//! by reading `<engine>/<path>` from Vault and returning the string stored under `<key>`.
//! KV version 2 engines are discovered on the fly: when Vault warns that the path belongs
//! to a versioned engine the read is repeated at `<engine>/data/<path>` and the engine is
//! remembered for later reads by the same decrypter.

pub mod auth;
pub mod client;

use self::auth::fetch_token;
use self::client::VaultHttpClient;
use super::config::SecretsConfig;
use super::decrypter::{Decrypter, DecrypterFactory};
use super::descriptor::parse_pairs;
use super::types::SecretString;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Backend name used in descriptors
pub const VAULT_BACKEND: &str = "vault";

/// Warning Vault attaches when a KV v1 style path is read from a KV v2 engine
pub const KV2_PATH_WARNING: &str = "Invalid path for a versioned K/V secrets engine";

/// A parsed Vault descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSecret {
    pub engine: String,
    pub path: String,
    pub key: String,
    pub base64_encoded: bool,
}

impl VaultSecret {
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut engine = None;
        let mut path = None;
        let mut key = None;
        let mut base64_encoded = false;

        for (name, value) in parse_pairs(descriptor)? {
            match name {
                "e" => engine = Some(value),
                "n" => path = Some(value),
                "k" => key = Some(value),
                "b" => {
                    base64_encoded = value.trim().parse().map_err(|_| {
                        Error::syntax(descriptor, format!("invalid value for key 'b': {:?}", value))
                    })?
                }
                other => {
                    return Err(Error::syntax(descriptor, format!("invalid key {:?}", other)));
                }
            }
        }

        let required = |value: Option<&str>, name: &str, what: &str| {
            value.filter(|v| !v.trim().is_empty()).map(str::to_string).ok_or_else(|| {
                Error::syntax(descriptor, format!("missing required key '{}' ({})", name, what))
            })
        };

        Ok(Self {
            engine: required(engine, "e", "secrets engine")?,
            path: required(path, "n", "secret path")?,
            key: required(key, "k", "secret key")?,
            base64_encoded,
        })
    }

    /// API path of the secret, with the `data/` segment for versioned engines
    pub fn path_for(&self, versioned: bool) -> String {
        let engine = self.engine.trim_matches('/');
        let path = self.path.trim_start_matches('/');
        if versioned {
            format!("{}/data/{}", engine, path)
        } else {
            format!("{}/{}", engine, path)
        }
    }

    /// Apply the base64 flag to a fetched value
    pub fn decode(&self, value: String) -> Result<String> {
        if !self.base64_encoded {
            return Ok(value);
        }
        let bytes = STANDARD
            .decode(value.trim())
            .map_err(|e| Error::Decode { key: self.key.clone(), message: e.to_string() })?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Decode { key: self.key.clone(), message: e.to_string() })
    }
}

/// Decrypter for one Vault descriptor.
///
/// Keeps the client token and the set of engines known to be KV v2 across calls.
#[derive(Debug)]
pub struct VaultDecrypter {
    descriptor: String,
    config: Arc<SecretsConfig>,
    token: Option<SecretString>,
    kv2_engines: HashSet<String>,
}

impl VaultDecrypter {
    pub fn new(descriptor: impl Into<String>, config: Arc<SecretsConfig>) -> Self {
        let token =
            config.vault.as_ref().and_then(|vault| vault.token.clone()).filter(|t| !t.is_empty());
        Self { descriptor: descriptor.into(), config, token, kv2_engines: HashSet::new() }
    }

    /// Factory producing Vault decrypters bound to `config`
    pub fn factory(config: Arc<SecretsConfig>) -> DecrypterFactory {
        Arc::new(move |descriptor: &str| {
            Box::new(VaultDecrypter::new(descriptor, Arc::clone(&config))) as Box<dyn Decrypter>
        })
    }

    /// Whether `engine` has been seen to be a KV v2 engine
    pub fn is_kv2(&self, engine: &str) -> bool {
        self.kv2_engines.contains(engine)
    }

    async fn fetch_secret(
        &mut self,
        client: &VaultHttpClient,
        secret: &VaultSecret,
        token: &SecretString,
    ) -> Result<String> {
        let versioned = self.is_kv2(&secret.engine);
        let mut read_path = secret.path_for(versioned);
        let mut response = client.read(token, &read_path).await?;

        if !versioned && response.as_ref().is_some_and(|r| r.has_warning(KV2_PATH_WARNING)) {
            read_path = secret.path_for(true);
            debug!(engine = %secret.engine, path = %read_path, "Versioned secrets engine, retrying read");
            response = client.read(token, &read_path).await.map_err(|e| {
                Error::not_found(format!("couldn't find vault path {:?}: {}", read_path, e))
            })?;
            if response.as_ref().is_some_and(|r| r.data.is_some()) {
                self.kv2_engines.insert(secret.engine.clone());
            }
        }

        let data = response
            .and_then(|r| r.data)
            .ok_or_else(|| Error::not_found(format!("couldn't find vault path {:?}", read_path)))?;

        match unwrap_versioned(data).get(&secret.key) {
            Some(Value::String(value)) => Ok(value.clone()),
            Some(_) => Err(Error::not_found(format!(
                "vault key {:?} under engine {:?} path {:?} is not a string",
                secret.key, secret.engine, secret.path
            ))),
            None => Err(Error::not_found(format!(
                "couldn't find vault key {:?} under engine {:?} path {:?}",
                secret.key, secret.engine, secret.path
            ))),
        }
    }
}

// KV v2 responses wrap the secret's fields in a second `data` object
fn unwrap_versioned(mut data: Map<String, Value>) -> Map<String, Value> {
    match data.remove("data") {
        Some(Value::Object(inner)) => inner,
        Some(other) => {
            data.insert("data".to_string(), other);
            data
        }
        None => data,
    }
}

#[async_trait]
impl Decrypter for VaultDecrypter {
    async fn decrypt(&mut self) -> Result<String> {
        let secrets = Arc::clone(&self.config);
        let config =
            secrets.vault.as_ref().ok_or_else(|| Error::config("vault secrets not configured"))?;
        config.validate()?;

        let secret = VaultSecret::parse(&self.descriptor)?;
        let client = VaultHttpClient::new(config)?;

        let (token, cached) = match self.token.clone() {
            Some(token) => (token, true),
            None => {
                let token = fetch_token(config, &client).await?;
                self.token = Some(token.clone());
                (token, false)
            }
        };

        let value = match self.fetch_secret(&client, &secret, &token).await {
            Ok(value) => value,
            Err(e) if cached => {
                warn!(
                    engine = %secret.engine,
                    path = %secret.path,
                    error = %e,
                    "Vault read failed with cached token, re-authenticating"
                );
                self.token = None;
                let token = fetch_token(config, &client).await?;
                self.token = Some(token.clone());
                self.fetch_secret(&client, &secret, &token).await?
            }
            Err(e) => return Err(e),
        };

        debug!(engine = %secret.engine, path = %secret.path, key = %secret.key, "Resolved Vault secret");
        secret.decode(value)
    }
}
