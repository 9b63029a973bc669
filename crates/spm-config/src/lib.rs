//! Configuration loading for the spm client
//!
//! This crate reads the user's `~/.spm/config.toml`, the project's
//! `package.json`, and layers environment variables and command-line flags
//! on top to produce the settings a registry client is created with.

pub mod toml;
pub mod json;
pub mod merge;

// Re-export main types
pub use crate::toml::{SpmConfig, RegistrySection, UserSection};
pub use json::PackageJson;
pub use merge::{ConfigLoader, ConfigLayering, ConfigSource, RegistrySettings};

use spm_core::error::SpmError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, SpmError>;
