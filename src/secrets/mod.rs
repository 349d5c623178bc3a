//! Secret decryption for configuration values.
//!
//! Configuration files store references to secrets rather than the secrets themselves.
//! A reference is a string value starting with `encrypted:` followed by the backend name
//! and backend-specific `key:value` pairs:
//!
//! ```text
//! encrypted:vault!e:secret!n:myapp/creds!k:password
//! ```
//!
//! # Architecture
//!
//! - [`Decrypter`]: turns one descriptor into its plaintext
//! - [`DecrypterRegistry`]: maps backend names to [`DecrypterFactory`] closures
//! - [`vault`]: the HashiCorp Vault backend (TOKEN, KUBERNETES and USERPASS auth,
//!   KV v1 and v2 engines)
//!
//! # Example
//!
//! ```rust,ignore
//! use confresolve::secrets::{DecrypterRegistry, SecretsConfig};
//! use std::sync::Arc;
//!
//! let config = Arc::new(SecretsConfig::from_tree(&tree)?);
//! let registry = DecrypterRegistry::with_defaults(config);
//!
//! let mut decrypter = registry.decrypter_for("encrypted:vault!e:secret!n:app!k:password")?;
//! let password = decrypter.decrypt().await?;
//! ```

pub mod config;
pub mod decrypter;
pub mod descriptor;
pub mod registry;
pub mod types;
pub mod vault;

pub use config::{SecretsConfig, VaultConfig, DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH};
pub use decrypter::{Decrypter, DecrypterFactory};
pub use descriptor::{backend_name, is_encrypted, ENCRYPTED_PREFIX};
pub use registry::DecrypterRegistry;
pub use types::SecretString;
pub use vault::auth::AuthMethod;
pub use vault::{VaultDecrypter, VaultSecret, VAULT_BACKEND};
