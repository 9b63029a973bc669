//! Registry response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transport::TransportResponse;

pub mod severity;

pub use severity::Severity;

/// Decoded JSON body returned by the registry
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RegistryResponse {
    /// `success`, `info`, `error`, or another severity name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Human-readable text for the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Package metadata or the login token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Any other top-level fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistryResponse {
    /// Interpret a decoded body; anything that is not an object yields an empty response.
    ///
    /// Fields are read one by one, so a `status` or `message` of the wrong
    /// type is moved to `extra` without losing the rest of the body.
    pub fn from_value(body: &Value) -> Self {
        let Value::Object(fields) = body else {
            return Self::default();
        };

        let mut response = Self::default();
        for (key, value) in fields {
            match (key.as_str(), value) {
                ("status", Value::String(status)) => response.status = Some(status.clone()),
                ("message", Value::String(message)) => response.message = Some(message.clone()),
                ("data", Value::Null) => {}
                ("data", data) => response.data = Some(data.clone()),
                _ => {
                    response.extra.insert(key.clone(), value.clone());
                }
            }
        }
        response
    }

    /// Logging severity implied by `status`
    pub fn severity(&self) -> Severity {
        self.status
            .as_deref()
            .map_or(Severity::Info, Severity::from_status)
    }

    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    /// Message text, or the status name when the registry sent none
    pub fn message_or_status(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.status.clone())
            .unwrap_or_else(|| "registry returned no message".to_string())
    }
}

/// A completed registry call: raw response plus interpreted body
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub response: TransportResponse,
    pub body: RegistryResponse,
}

impl Reply {
    /// Message to report when this reply means the call did not succeed
    pub fn failure(&self) -> Option<String> {
        if self.body.is_error() || self.response.status >= 400 {
            Some(self.body.message_or_status())
        } else {
            None
        }
    }
}
