//! Decrypter plugin contract
//!
//! A backend turns one secret descriptor into its plaintext. Instances are built per
//! descriptor by a [`DecrypterFactory`] registered under the backend's name.

use crate::errors::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Resolves a single secret descriptor to its plaintext value.
///
/// Implementations may keep per-instance state (cached tokens, discovered API versions)
/// between calls, which is why `decrypt` takes `&mut self`.
#[async_trait]
pub trait Decrypter: Send + fmt::Debug {
    async fn decrypt(&mut self) -> Result<String>;
}

/// Builds a decrypter for a raw descriptor string.
///
/// Factories close over whatever process-wide backend configuration they need.
pub type DecrypterFactory = Arc<dyn Fn(&str) -> Box<dyn Decrypter> + Send + Sync>;
