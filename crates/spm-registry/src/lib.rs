//! Client for the spm package registry (yuan)
//!
//! This crate turns loosely-typed option bags into HTTP request descriptors
//! and drives the registry's account, publish and lookup endpoints.

pub mod api;
pub mod client;
pub mod request;
pub mod transport;

// Re-export main types
pub use api::{RegistryResponse, Reply, Severity};
pub use client::{
    resolve_download, ClientEvent, ClientOptions, DownloadLink, LoginParams, PublishParams,
    RegistryClient,
};
pub use request::{
    build_request, build_request_with_locale, BuiltRequest, Options, Payload, RequestDescriptor,
};
pub use transport::{HttpTransport, Transport, TransportResponse};

use spm_core::error::SpmError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, SpmError>;
