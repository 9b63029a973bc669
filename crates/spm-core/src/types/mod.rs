//! Core data types for spm.
//!
//! - Package coordinates (`root/name@version`) as addressed by the registry

pub mod package;

// Re-export all public types
pub use package::PackageId;
