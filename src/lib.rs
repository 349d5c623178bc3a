//! # confresolve
//!
//! Layered configuration resolution for services that read YAML profiles.
//!
//! Several documents (defaults, profile overlays, local overrides) are deep-merged in
//! order, `${path:default}` placeholders are resolved against the merged tree and the
//! environment, and values of the form `encrypted:<backend>!...` are replaced with
//! plaintext fetched from a secret store.
//!
//! ## Pipeline
//!
//! ```text
//! YAML files → merge → placeholders → secrets.vault config → decrypt → resolved tree
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use confresolve::{loader, resolve, Env, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let trees = loader::load_files(&["spinnaker.yml", "spinnaker-local.yml"])?;
//!     let env: Env = std::env::vars().collect();
//!     let resolved = resolve(&trees, &env).await?;
//!     println!("{}", serde_json::to_string_pretty(&resolved)?);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod errors;
pub mod loader;
pub mod merge;
pub mod placeholder;
pub mod resolver;
pub mod secrets;
pub mod tree;

// Re-export commonly used types and functions
pub use errors::{Error, ErrorCategory, Result};
pub use merge::merge;
pub use placeholder::{resolve_placeholders, PlaceholderResolver};
pub use resolver::{decrypt_tree, resolve, Resolver};
pub use tree::{Env, Tree};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
