//! HTTP transport for request descriptors
//!
//! The client never talks to `reqwest` directly; it hands a
//! [`RequestDescriptor`] to a [`Transport`] and gets back the status code,
//! headers and the already-decoded body.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Proxy};
use serde_json::Value;
use tracing::debug;

use spm_core::error::SpmError;
use crate::request::{Payload, RequestDescriptor};
use crate::RegistryResult;

/// Response as seen by the registry client
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers with lowercase names
    pub headers: BTreeMap<String, String>,
    /// Decoded body: JSON when possible, otherwise the text as a JSON string
    pub body: Value,
}

impl TransportResponse {
    /// Decode raw body bytes the way registry replies are read
    pub fn decode_body(bytes: &[u8]) -> Value {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Value::Null;
        }
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// Something that can perform one HTTP exchange
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request; an `Err` means no response was obtained
    async fn send(&self, request: &RequestDescriptor) -> RegistryResult<TransportResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &RequestDescriptor) -> RegistryResult<TransportResponse> {
        (**self).send(request).await
    }
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Shared client used for requests without a proxy
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the default connection settings
    pub fn new() -> RegistryResult<Self> {
        let client = Self::builder()
            .build()
            .map_err(|e| SpmError::network(format!("Failed to create HTTP client: {}", e), e))?;
        Ok(Self { client })
    }

    fn builder() -> ClientBuilder {
        ClientBuilder::new().gzip(true)
    }

    /// Client for one request; a proxied request gets its own client
    fn client_for(&self, proxy: Option<&str>) -> RegistryResult<Client> {
        let Some(proxy) = proxy else {
            return Ok(self.client.clone());
        };

        let proxy = Proxy::all(proxy).map_err(|e| SpmError::ConfigValidation {
            field: "proxy".to_string(),
            reason: format!("Invalid proxy '{}': {}", proxy, e),
        })?;

        Self::builder()
            .proxy(proxy)
            .build()
            .map_err(|e| {
                SpmError::network(format!("Failed to create proxied HTTP client: {}", e), e)
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> RegistryResult<TransportResponse> {
        let client = self.client_for(request.proxy.as_deref())?;

        let mut builder = client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.payload {
            Payload::Json(value) => builder.json(value),
            Payload::Body(bytes) => builder.body(bytes.clone()),
        };

        let response = builder.send().await.map_err(|e| {
            SpmError::network(format!("{} {} failed: {}", request.method, request.url, e), e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let bytes = response.bytes().await.map_err(|e| {
            SpmError::network(format!("Failed to read response from {}: {}", request.url, e), e)
        })?;
        debug!("{} {} -> {} ({} bytes)", request.method, request.url, status, bytes.len());

        Ok(TransportResponse {
            status,
            headers,
            body: TransportResponse::decode_body(&bytes),
        })
    }
}
