//! # spm-core
//!
//! Core types and utilities shared across all spm crates.
//!
//! This crate provides:
//! - `SpmError` enum for unified error handling
//! - `PackageId`, the root/name/version coordinate used by the registry
//!
//! ## Architecture
//!
//! - `error`: Error types and result aliases
//! - `types`: Core data types

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{SpmError, SpmResult};
pub use types::PackageId;
