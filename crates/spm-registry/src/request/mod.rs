//! Request construction for registry calls
//!
//! Turns an option bag into a ready-to-send [`RequestDescriptor`]. The
//! header-bearing keys (`auth`, `force`, `lang`, `proxy`) are consumed on the
//! way; whatever is left becomes the JSON payload.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Registry used when no `server` is configured
pub const DEFAULT_SERVER: &str = "https://spmjs.org";

/// Locale sent when neither `lang` nor `LANG` is set
pub const DEFAULT_LOCALE: &str = "en_US";

/// Identifies this client to the registry
pub const USER_AGENT: &str = concat!("spm ", env!("CARGO_PKG_VERSION"));

/// Media type of an uploaded package artifact
pub const TARBALL_CONTENT_TYPE: &str = "application/x-tar-gz";

/// Loosely-typed option bag handed to the request builder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    /// Create an empty option bag
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set a key, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style [`Options::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Copy every entry of `other` into this bag
    pub fn extend(&mut self, other: Map<String, Value>) {
        self.0.extend(other);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`, ignoring empty strings
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Remove `key` and return it if it held a non-empty string
    fn take_str(&mut self, key: &str) -> Option<String> {
        match self.0.remove(key) {
            Some(Value::String(value)) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    /// Remove `key` and report whether it was truthy
    fn take_flag(&mut self, key: &str) -> bool {
        match self.0.remove(key) {
            Some(Value::Bool(flag)) => flag,
            Some(Value::String(value)) => !matches!(value.as_str(), "" | "false" | "0"),
            Some(Value::Number(number)) => number.as_f64().map_or(false, |n| n != 0.0),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
            Some(Value::Null) | None => false,
        }
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// What travels in the request body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured payload, sent as JSON
    Json(Value),
    /// Raw bytes, sent as-is
    Body(Vec<u8>),
}

/// Normalized HTTP request, ready for a [`crate::Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Absolute request URL
    pub url: String,
    pub method: Method,
    /// Header name to value, names kept exactly as set
    pub headers: BTreeMap<String, String>,
    pub payload: Payload,
    /// Proxy URL to route this request through
    pub proxy: Option<String>,
}

impl RequestDescriptor {
    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// JSON payload, if this request carries one
    pub fn json(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Json(value) => Some(value),
            Payload::Body(_) => None,
        }
    }

    /// Raw body, if this request carries one
    pub fn body(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Body(bytes) => Some(bytes),
            Payload::Json(_) => None,
        }
    }

    /// Turn this request into the artifact upload that follows registration.
    ///
    /// The JSON payload is replaced by the artifact bytes and the method
    /// becomes `PUT`; every other header is kept.
    pub fn prepare_upload(&mut self, artifact: Vec<u8>, size: u64) {
        self.headers
            .insert("content-type".to_string(), TARBALL_CONTENT_TYPE.to_string());
        self.headers
            .insert("content-length".to_string(), size.to_string());
        self.payload = Payload::Body(artifact);
        self.method = Method::PUT;
    }
}

/// A descriptor together with the options left after header extraction
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRequest {
    pub descriptor: RequestDescriptor,
    /// Options that were not consumed; also the descriptor's JSON payload
    pub residual: Options,
}

/// Build a request, falling back to the `LANG` environment variable for locale
pub fn build_request(options: Options) -> BuiltRequest {
    build_request_with_locale(options, std::env::var("LANG").ok())
}

/// Build a request with an explicit fallback locale.
///
/// The method defaults to `GET`; callers set the verb their endpoint needs.
pub fn build_request_with_locale(mut options: Options, env_locale: Option<String>) -> BuiltRequest {
    let server = options.get_str("server").unwrap_or(DEFAULT_SERVER);
    let server = server.strip_suffix('/').unwrap_or(server);
    let path = match options.get("url") {
        Some(Value::String(path)) => path.as_str(),
        _ => "",
    };
    let url = format!("{}/{}", server, path);

    let mut headers = BTreeMap::new();

    if let Some(auth) = options.take_str("auth") {
        headers.insert("Authorization".to_string(), format!("Yuan {}", auth));
    }

    if options.take_flag("force") {
        headers.insert("X-Yuan-Force".to_string(), "true".to_string());
    }

    headers.insert("user-agent".to_string(), USER_AGENT.to_string());

    let locale = options
        .take_str("lang")
        .or_else(|| env_locale.filter(|lang| !lang.is_empty()))
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
    headers.insert("Accept-Language".to_string(), locale);

    let proxy = options.take_str("proxy");

    let descriptor = RequestDescriptor {
        url,
        method: Method::GET,
        headers,
        payload: Payload::Json(Value::Object(options.0.clone())),
        proxy,
    };

    BuiltRequest {
        descriptor,
        residual: options,
    }
}
