//! Secret backend configuration carried inside the configuration tree.
//!
//! The merged, placeholder-resolved tree holds the backend settings under
//! `secrets.<backend>`. They are extracted once per resolution pass and shared read-only
//! by every decrypter built during that pass.

use super::types::SecretString;
use crate::errors::{Error, Result};
use crate::tree::{self, Tree};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Where Kubernetes mounts the pod's service-account token
pub const DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Tree path of the Vault settings
pub const VAULT_CONFIG_PATH: &str = "secrets.vault";

/// Settings for every secret backend known to this process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecretsConfig {
    /// `None` when the tree has no `secrets.vault` block
    pub vault: Option<VaultConfig>,
}

impl SecretsConfig {
    pub fn new(vault: Option<VaultConfig>) -> Self {
        Self { vault }
    }

    /// Extract backend settings from a resolved configuration tree
    pub fn from_tree(tree: &Tree) -> Result<Self> {
        let vault = match tree::lookup(tree, VAULT_CONFIG_PATH) {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value.clone()).map_err(|e| {
                Error::config(format!("invalid {} configuration: {}", VAULT_CONFIG_PATH, e))
            })?),
        };
        Ok(Self { vault })
    }
}

/// Configuration for the HashiCorp Vault backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub enabled: bool,

    /// Vault server address (e.g. "https://vault.example.com:8200")
    #[serde(default)]
    pub url: String,

    /// One of TOKEN, KUBERNETES, USERPASS
    #[serde(default)]
    pub auth_method: String,

    /// Kubernetes auth role
    #[serde(default)]
    pub role: String,

    /// Kubernetes auth mount path
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: SecretString,

    /// Userpass auth mount path
    #[serde(default)]
    pub user_auth_path: String,

    /// Vault Enterprise namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Already-authenticated token; skips the first login when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<SecretString>,

    #[serde(default = "default_service_account_token_path")]
    pub service_account_token_path: PathBuf,
}

fn default_service_account_token_path() -> PathBuf {
    PathBuf::from(DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH)
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            auth_method: String::new(),
            role: String::new(),
            path: String::new(),
            username: String::new(),
            password: SecretString::default(),
            user_auth_path: String::new(),
            namespace: None,
            token: None,
            service_account_token_path: default_service_account_token_path(),
        }
    }
}

impl VaultConfig {
    /// Check the settings needed before any request is made
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Err(Error::config("vault secrets disabled"));
        }
        if self.auth_method.trim().is_empty() {
            return Err(Error::config("vault auth method required"));
        }
        if self.url.trim().is_empty() {
            return Err(Error::config("vault url required"));
        }
        Ok(())
    }

    /// Namespace header value, ignoring blanks
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().map(str::trim).filter(|ns| !ns.is_empty())
    }
}

// Placeholders always produce strings, so `enabled: ${VAULT_ENABLED:false}` arrives as "false".
fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(false),
        Some(BoolOrString::Bool(value)) => Ok(value),
        Some(BoolOrString::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            _ => Err(D::Error::custom(format!("invalid boolean {:?}", text))),
        },
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
    fn test_userpass_config() {
        let t = tree(json!({"secrets": {"vault": {
            "enabled": true,
            "url": "https://vault.com",
            "username": "name",
            "password": "pw",
            "userAuthPath": "userpass",
            "authMethod": "USERPASS"
        }}}));

        let config = SecretsConfig::from_tree(&t).unwrap().vault.unwrap();
        assert_eq!(
            config,
            VaultConfig {
                enabled: true,
                url: "https://vault.com".into(),
                auth_method: "USERPASS".into(),
                username: "name".into(),
                password: "pw".into(),
                user_auth_path: "userpass".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_kubernetes_config_with_namespace() {
        let t = tree(json!({"secrets": {"vault": {
            "enabled": true,
            "url": "https://vault.com",
            "namespace": "ent-namespace",
            "path": "kubernetes",
            "role": "my-role",
            "authMethod": "KUBERNETES"
        }}}));

        let config = SecretsConfig::from_tree(&t).unwrap().vault.unwrap();
        assert_eq!(config.path, "kubernetes");
        assert_eq!(config.role, "my-role");
        assert_eq!(config.namespace(), Some("ent-namespace"));
        assert_eq!(
            config.service_account_token_path,
            PathBuf::from(DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_config() {
        let t = tree(json!({"secrets": {"vault": {
            "enabled": false, "url": "https://vault.com", "authMethod": "TOKEN"
        }}}));
        let config = SecretsConfig::from_tree(&t).unwrap().vault.unwrap();
        assert!(!config.enabled);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn test_enabled_accepts_placeholder_strings() {
        let t = tree(json!({"secrets": {"vault": {"enabled": "true", "url": "u", "authMethod": "TOKEN"}}}));
        assert!(SecretsConfig::from_tree(&t).unwrap().vault.unwrap().enabled);

        let t = tree(json!({"secrets": {"vault": {"enabled": "nope"}}}));
        assert!(matches!(SecretsConfig::from_tree(&t).unwrap_err(), Error::Config(_)));
    }

    #[test]
    fn test_missing_block() {
        let t = tree(json!({"services": {}}));
        assert_eq!(SecretsConfig::from_tree(&t).unwrap(), SecretsConfig::default());

        let t = tree(json!({"secrets": {"vault": null}}));
        assert!(SecretsConfig::from_tree(&t).unwrap().vault.is_none());
    }

    #[test]
    fn test_validate_requires_fields() {
        let config = VaultConfig { enabled: true, url: "https://vault.com".into(), ..Default::default() };
        assert!(config.validate().unwrap_err().to_string().contains("auth method"));

        let config = VaultConfig { enabled: true, auth_method: "TOKEN".into(), ..Default::default() };
        assert!(config.validate().unwrap_err().to_string().contains("url"));
    }

    #[test]
    fn test_blank_namespace_ignored() {
        let config = VaultConfig { namespace: Some("  ".into()), ..Default::default() };
        assert_eq!(config.namespace(), None);
    }
}
