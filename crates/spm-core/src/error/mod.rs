//! Error types and result aliases for spm operations.
//!
//! Provides a unified error type that covers transport failures, registry
//! replies, configuration problems and local IO, with actionable messages.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for all spm operations
#[derive(Error, Debug)]
pub enum SpmError {
    // Config errors
    #[error("Failed to parse {file}: {message} at line {line}, column {column}")]
    TomlParse {
        file: String,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Failed to parse package.json: {message}")]
    JsonParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    /// No response was obtained from the registry.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The registry answered, but refused or could not serve the request.
    #[error("Registry error: {message}")]
    Registry {
        status: Option<String>,
        message: String,
    },

    /// Registering a version failed, so its artifact must not be uploaded.
    #[error("Publish aborted: {message}")]
    PublishAborted { message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for spm operations
pub type SpmResult<T> = Result<T, SpmError>;

impl SpmError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io {
            message,
            path: None,
            source,
        }
    }

    /// Create an IO error that remembers which file was involved
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::Io {
            message: format!("{}: {}", path.display(), source),
            path: Some(path),
            source,
        }
    }

    /// Create an application-level error from a registry reply
    pub fn registry(status: Option<&str>, message: impl Into<String>) -> Self {
        Self::Registry {
            status: status.map(str::to_string),
            message: message.into(),
        }
    }

    /// Errors after which the caller must stop the whole process
    pub fn is_fatal(&self) -> bool {
        matches!(self, SpmError::PublishAborted { .. })
    }

    /// Check if this error came from the transport rather than the registry
    pub fn is_transport(&self) -> bool {
        matches!(self, SpmError::Network { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SpmError::Network { .. } => {
                Some("Check your internet connection, proxy and --server setting")
            },
            SpmError::PublishAborted { .. } => {
                Some("Nothing was uploaded; fix the reported problem and publish again")
            },
            SpmError::ConfigValidation { .. } | SpmError::TomlParse { .. } => {
                Some("Check ~/.spm/config.toml or the matching SPM_* environment variable")
            },
            SpmError::JsonParse { .. } => {
                Some("package.json must be valid JSON with name and version")
            },
            _ => None,
        }
    }
}
