//! Vault authentication methods

use super::client::VaultHttpClient;
use crate::errors::{Error, Result};
use crate::secrets::config::VaultConfig;
use crate::secrets::types::SecretString;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Environment variable holding the token for [`AuthMethod::Token`]
pub const VAULT_TOKEN_ENV: &str = "VAULT_TOKEN";

/// How the decrypter obtains a Vault client token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Token,
    Kubernetes,
    Userpass,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Token => "TOKEN",
            AuthMethod::Kubernetes => "KUBERNETES",
            AuthMethod::Userpass => "USERPASS",
        }
    }
}

impl FromStr for AuthMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "TOKEN" => Ok(AuthMethod::Token),
            "KUBERNETES" => Ok(AuthMethod::Kubernetes),
            "USERPASS" => Ok(AuthMethod::Userpass),
            other => Err(Error::auth(format!("unknown Vault secrets auth method: {:?}", other))),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Obtain a fresh client token using the configured method
pub async fn fetch_token(config: &VaultConfig, client: &VaultHttpClient) -> Result<SecretString> {
    let method: AuthMethod = config.auth_method.parse()?;
    debug!(auth_method = %method, address = %client.address(), "Obtaining Vault token");

    match method {
        AuthMethod::Token => token_from_env(),
        AuthMethod::Kubernetes => kubernetes_login(config, client).await,
        AuthMethod::Userpass => userpass_login(config, client).await,
    }
}

fn token_from_env() -> Result<SecretString> {
    match std::env::var(VAULT_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Ok(SecretString::new(token)),
        _ => Err(Error::auth(format!("{} environment variable not set", VAULT_TOKEN_ENV))),
    }
}

async fn kubernetes_login(config: &VaultConfig, client: &VaultHttpClient) -> Result<SecretString> {
    if config.role.trim().is_empty() || config.path.trim().is_empty() {
        return Err(Error::auth("role and path are required for KUBERNETES vault auth"));
    }

    let jwt = tokio::fs::read_to_string(&config.service_account_token_path).await.map_err(|e| {
        Error::auth(format!(
            "error reading service account token {}: {}",
            config.service_account_token_path.display(),
            e
        ))
    })?;
    let jwt = SecretString::new(jwt.trim());

    let body = json!({ "role": config.role, "jwt": jwt.expose_secret() });
    client.login(&format!("auth/{}/login", config.path.trim_matches('/')), &body).await
}

async fn userpass_login(config: &VaultConfig, client: &VaultHttpClient) -> Result<SecretString> {
    if config.username.trim().is_empty()
        || config.password.is_empty()
        || config.user_auth_path.trim().is_empty()
    {
        return Err(Error::auth(
            "username, password and userAuthPath are required for USERPASS vault auth",
        ));
    }

    let body = json!({ "password": config.password.expose_secret() });
    let path =
        format!("auth/{}/login/{}", config.user_auth_path.trim_matches('/'), config.username);
    client.login(&path, &body).await
}
