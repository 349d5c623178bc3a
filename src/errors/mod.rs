//! # Error Handling
//!
//! Error types for configuration resolution and secret decryption, defined with
//! `thiserror`. Every failure aborts the resolution pass; nothing is logged and swallowed.

use std::fmt;

/// Custom result type for confresolve operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for configuration resolution
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Secret backend configuration is unset, disabled or incomplete
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed placeholder or secret descriptor
    #[error("Syntax error in {input:?}: {message}")]
    Syntax { input: String, message: String },

    /// Placeholder with no tree value, environment variable or default
    #[error("Unresolved placeholder: no value for '{path}'")]
    Unresolved { path: String },

    /// Placeholder chain that refers back to itself
    #[error("Cyclic placeholder reference: {chain}")]
    CyclicReference { chain: String },

    /// Missing credentials or failed login exchange
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Secret store could not be reached or answered with something other than its API
    #[error("Cannot reach secret store at {url}: {message}")]
    Unreachable { url: String, message: String },

    /// Secret store answered with an error status
    #[error("Secret store error (status: {status}): {message}")]
    SecretStore { status: u16, message: String },

    /// Secret path or key does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Descriptor names a backend nobody registered
    #[error("No decrypter registered for secret backend '{0}'")]
    UnknownBackend(String),

    /// Secret value could not be decoded
    #[error("Decode error for key '{key}': {message}")]
    Decode { key: String, message: String },

    /// Failure while resolving the secret at a given tree location
    #[error("Failed to decrypt secret at '{location}': {source}")]
    Secret {
        location: String,
        #[source]
        source: Box<Error>,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error category, stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Syntax,
    Resolution,
    Authentication,
    Connectivity,
    NotFound,
    Io,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Syntax => write!(f, "syntax"),
            ErrorCategory::Resolution => write!(f, "resolution"),
            ErrorCategory::Authentication => write!(f, "authentication"),
            ErrorCategory::Connectivity => write!(f, "connectivity"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a syntax error for the given input
    pub fn syntax<I: Into<String>, S: Into<String>>(input: I, message: S) -> Self {
        Self::Syntax { input: input.into(), message: message.into() }
    }

    /// Create an unresolved-placeholder error
    pub fn unresolved<S: Into<String>>(path: S) -> Self {
        Self::Unresolved { path: path.into() }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth(message.into())
    }

    /// Create an unreachable-store error
    pub fn unreachable<U: Into<String>, S: Into<String>>(url: U, message: S) -> Self {
        Self::Unreachable { url: url.into(), message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Wrap an error with the tree location of the descriptor that caused it
    pub fn at_location<S: Into<String>>(self, location: S) -> Self {
        Self::Secret { location: location.into(), source: Box::new(self) }
    }

    /// Category used by callers to branch on failure kind
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::UnknownBackend(_) => ErrorCategory::Configuration,
            Error::Syntax { .. } | Error::Decode { .. } => ErrorCategory::Syntax,
            Error::Yaml(_) | Error::Json(_) => ErrorCategory::Syntax,
            Error::Unresolved { .. } | Error::CyclicReference { .. } => ErrorCategory::Resolution,
            Error::Auth(_) => ErrorCategory::Authentication,
            Error::Unreachable { .. } | Error::SecretStore { .. } => ErrorCategory::Connectivity,
            Error::NotFound(_) => ErrorCategory::NotFound,
            Error::Io { .. } => ErrorCategory::Io,
            Error::Secret { source, .. } => source.category(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}
