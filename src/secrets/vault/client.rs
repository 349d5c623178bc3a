//! Minimal Vault HTTP transport.
//!
//! Talks to the `v1/` API directly with `reqwest` so response warnings and non-API
//! answers (proxies, captive portals, HTML error pages) stay visible to the caller.

use crate::errors::{Error, Result};
use crate::secrets::config::VaultConfig;
use crate::secrets::types::SecretString;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Body of a Vault API response. Every field is optional; Vault omits or nulls them freely.
#[derive(Debug, Default, Deserialize)]
pub struct VaultResponse {
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub auth: Option<VaultAuth>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct VaultAuth {
    pub client_token: SecretString,
}

impl VaultResponse {
    /// Whether any warning contains `needle`
    pub fn has_warning(&self, needle: &str) -> bool {
        self.warnings.iter().flatten().any(|warning| warning.contains(needle))
    }

    fn error_message(&self) -> String {
        match self.errors.as_deref() {
            Some(errors) if !errors.is_empty() => errors.join("; "),
            _ => "no error details".to_string(),
        }
    }
}

/// HTTP client bound to one Vault server
#[derive(Debug, Clone)]
pub struct VaultHttpClient {
    http: reqwest::Client,
    base_url: String,
    address: String,
    namespace: Option<String>,
}

impl VaultHttpClient {
    pub fn new(config: &VaultConfig) -> Result<Self> {
        let address = config.url.trim().to_string();
        let parsed = Url::parse(&address)
            .map_err(|e| Error::config(format!("invalid vault url {:?}: {}", address, e)))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::config(format!("Failed to create Vault HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            address,
            namespace: config.namespace().map(str::to_string),
        })
    }

    /// Server address as configured
    pub fn address(&self) -> &str {
        &self.address
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn with_namespace(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.namespace {
            Some(namespace) => request.header(NAMESPACE_HEADER, namespace),
            None => request,
        }
    }

    /// Exchange credentials at `path` for a client token
    pub async fn login(&self, path: &str, body: &Value) -> Result<SecretString> {
        debug!(address = %self.address, path = %path, "Logging in to Vault");
        let request = self.with_namespace(self.http.post(self.endpoint(path)).json(body));

        let response = match self.execute(request).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                return Err(Error::auth(format!("vault login endpoint {:?} not found", path)))
            }
            Err(e @ Error::Unreachable { .. }) => return Err(e),
            Err(e) => {
                return Err(Error::auth(format!("error logging into vault at {:?}: {}", path, e)))
            }
        };

        match response.auth {
            Some(auth) if !auth.client_token.is_empty() => Ok(auth.client_token),
            _ => Err(Error::auth(format!("vault login at {:?} returned no client token", path))),
        }
    }

    /// Read `path`; `None` when Vault reports nothing there and gave no warnings
    pub async fn read(&self, token: &SecretString, path: &str) -> Result<Option<VaultResponse>> {
        debug!(address = %self.address, path = %path, "Reading Vault secret");
        let request = self.with_namespace(
            self.http.get(self.endpoint(path)).header(TOKEN_HEADER, token.expose_secret()),
        );
        self.execute(request).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Option<VaultResponse>> {
        let response =
            request.send().await.map_err(|e| Error::unreachable(&self.address, e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| Error::unreachable(&self.address, e.to_string()))?;

        if body.trim().is_empty() {
            return match status {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => Ok(Some(VaultResponse::default())),
                status => Err(status_error(status, &VaultResponse::default())),
            };
        }

        let is_json = match &content_type {
            Some(content_type) => content_type.contains("json"),
            None => body.trim_start().starts_with('{'),
        };
        if !is_json {
            return Err(Error::unreachable(
                &self.address,
                format!(
                    "unexpected {} response with content type {}",
                    status.as_u16(),
                    content_type.as_deref().unwrap_or("unknown")
                ),
            ));
        }

        let parsed: VaultResponse = serde_json::from_str(&body).map_err(|e| Error::SecretStore {
            status: status.as_u16(),
            message: format!("invalid response body: {}", e),
        })?;

        if status == StatusCode::NOT_FOUND {
            let has_warnings = parsed.warnings.as_ref().is_some_and(|w| !w.is_empty());
            return Ok(has_warnings.then_some(parsed));
        }
        if !status.is_success() {
            return Err(status_error(status, &parsed));
        }
        Ok(Some(parsed))
    }
}

fn status_error(status: StatusCode, response: &VaultResponse) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::auth(format!(
            "vault rejected the request (status {}): {}",
            status.as_u16(),
            response.error_message()
        )),
        _ => Error::SecretStore { status: status.as_u16(), message: response.error_message() },
    }
}
