//! Registry client: login, publish and package lookup
//!
//! Every call goes through [`RegistryClient::dispatch`], which logs the
//! request, notifies subscribed observers and hands the outcome to a
//! completion handler. Publishing is the exception for its first phase,
//! which is sent directly so that a failed registration stops everything.

use std::path::PathBuf;

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{error, info};

use spm_core::error::SpmError;
use spm_core::types::PackageId;
use crate::api::{RegistryResponse, Reply};
use crate::request::{build_request, BuiltRequest, Options, RequestDescriptor};
use crate::transport::{HttpTransport, Transport, TransportResponse};
use crate::RegistryResult;

mod download;

pub use download::{resolve_download, DownloadLink};

/// Lifecycle notification for one dispatched request
#[derive(Debug)]
pub enum ClientEvent<'a> {
    /// Decoded response body
    Data(&'a RegistryResponse),
    /// Raw response
    Response(&'a TransportResponse),
    /// No response could be obtained
    Error(&'a SpmError),
    /// Last event for a request
    End,
}

impl ClientEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Data(_) => "data",
            ClientEvent::Response(_) => "response",
            ClientEvent::Error(_) => "error",
            ClientEvent::End => "end",
        }
    }
}

type Observer = Box<dyn Fn(&ClientEvent<'_>) + Send + Sync>;

/// Settings shared by every call a client makes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientOptions {
    /// Registry base URL; `https://spmjs.org` when unset
    pub server: Option<String>,
    /// Token sent as `Authorization: Yuan <auth>`
    pub auth: Option<String>,
    /// Ask the registry to overwrite existing versions
    pub force: bool,
    /// Value for `Accept-Language`
    pub lang: Option<String>,
    pub proxy: Option<String>,
    /// Overrides the registry's `download_base` for lookups
    pub download_base: Option<String>,
    /// Extra fields forwarded in every JSON payload
    pub extra: Map<String, Value>,
}

impl ClientOptions {
    /// Client options for one registry
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
            ..Self::default()
        }
    }

    /// Option bag seeded from these settings
    pub fn to_options(&self) -> Options {
        let mut options = Options::from(self.extra.clone());
        let strings = [
            ("server", &self.server),
            ("auth", &self.auth),
            ("lang", &self.lang),
            ("proxy", &self.proxy),
            ("download_base", &self.download_base),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                options.insert(key, value.as_str());
            }
        }
        if self.force {
            options.insert("force", true);
        }
        options
    }
}

/// Login identifiers; the first of `account`, `username`, `email` wins
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginParams {
    pub account: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Package to register and the artifact to upload for it
#[derive(Debug, Clone, PartialEq)]
pub struct PublishParams {
    pub root: String,
    pub name: String,
    pub version: String,
    /// Local path of the gzip tarball
    pub tarfile: PathBuf,
    /// Extra package fields sent with the registration
    pub metadata: Map<String, Value>,
}

impl PublishParams {
    pub fn new(id: &PackageId, tarfile: impl Into<PathBuf>) -> Self {
        Self {
            root: id.root.clone(),
            name: id.name.clone(),
            version: id.version.clone().unwrap_or_default(),
            tarfile: tarfile.into(),
            metadata: Map::new(),
        }
    }

    fn validate(&self) -> RegistryResult<PackageId> {
        let required = [
            ("root", &self.root),
            ("name", &self.name),
            ("version", &self.version),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(SpmError::ConfigValidation {
                    field: field.to_string(),
                    reason: "is required to publish".to_string(),
                });
            }
        }
        Ok(PackageId::new(&self.root, &self.name).with_version(&self.version))
    }
}

/// Client for one registry.
///
/// A client is meant for one logical operation at a time; it holds no
/// per-call state, but observers see events from every call it makes.
pub struct RegistryClient<T: Transport = HttpTransport> {
    options: ClientOptions,
    transport: T,
    observers: Vec<Observer>,
}

impl RegistryClient<HttpTransport> {
    /// Create a client that talks HTTP through `reqwest`
    pub fn new(options: ClientOptions) -> RegistryResult<Self> {
        Ok(Self::with_transport(options, HttpTransport::new()?))
    }
}

impl<T: Transport> RegistryClient<T> {
    /// Create a client over any transport
    pub fn with_transport(options: ClientOptions, transport: T) -> Self {
        Self {
            options,
            transport,
            observers: Vec::new(),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Register an observer for request lifecycle events
    pub fn subscribe<F>(&mut self, observer: F) -> &mut Self
    where
        F: Fn(&ClientEvent<'_>) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
        self
    }

    fn emit(&self, event: &ClientEvent<'_>) {
        for observer in &self.observers {
            observer(event);
        }
    }

    /// Send a request through the event path.
    ///
    /// Observers get `Data` then `Response` (or `Error`), then `complete`
    /// runs, then observers get `End`. Returns what `complete` returns.
    async fn dispatch<R, F>(&self, request: &RequestDescriptor, complete: F) -> R
    where
        F: FnOnce(RegistryResult<Reply>) -> R,
    {
        info!("{} {}", request.method, request.url);

        let outcome = match self.transport.send(request).await {
            Ok(response) => {
                let body = RegistryResponse::from_value(&response.body);
                if let Some(message) = &body.message {
                    body.severity().log(message);
                }
                self.emit(&ClientEvent::Data(&body));
                self.emit(&ClientEvent::Response(&response));
                Ok(Reply { response, body })
            }
            Err(err) => {
                error!("{}", err);
                self.emit(&ClientEvent::Error(&err));
                Err(err)
            }
        };

        let result = complete(outcome);
        self.emit(&ClientEvent::End);
        result
    }

    /// Send a request and return the reply without interpreting its body
    pub async fn request(&self, request: &RequestDescriptor) -> RegistryResult<Reply> {
        self.dispatch(request, |outcome| outcome).await
    }

    /// Log in to the registry.
    ///
    /// The reply is returned as-is; check [`Reply::failure`] for a refusal.
    pub async fn login(&self, params: &LoginParams) -> RegistryResult<Reply> {
        let mut options = self.options.to_options();
        let fields = [
            ("account", &params.account),
            ("username", &params.username),
            ("email", &params.email),
            ("password", &params.password),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                options.insert(key, value.as_str());
            }
        }

        let account = ["account", "username", "email"]
            .into_iter()
            .find_map(|key| options.get_str(key))
            .map(str::to_string)
            .ok_or_else(|| SpmError::ConfigValidation {
                field: "account".to_string(),
                reason: "login needs an account, username or email".to_string(),
            })?;
        options.insert("account", account);
        options.insert("url", "account/login");

        let BuiltRequest { mut descriptor, .. } = build_request(options);
        descriptor.method = Method::POST;
        self.request(&descriptor).await
    }

    /// Register a package version, then upload its artifact.
    ///
    /// A registration that fails at the transport or comes back with status
    /// `error` yields [`SpmError::PublishAborted`]; the caller is expected to
    /// stop. Any status other than `success`/`info` ends the call with a
    /// [`SpmError::Registry`] and nothing is uploaded.
    pub async fn publish(&self, params: &PublishParams) -> RegistryResult<Reply> {
        let id = params.validate()?;

        let mut options = self.options.to_options();
        options.extend(params.metadata.clone());
        options.insert("root", params.root.as_str());
        options.insert("name", params.name.as_str());
        options.insert("version", params.version.as_str());
        options.insert("tarfile", params.tarfile.to_string_lossy().into_owned());
        options.insert("url", id.repository_path());

        let BuiltRequest { mut descriptor, .. } = build_request(options);
        descriptor.method = Method::POST;

        info!("{} {}", descriptor.method, descriptor.url);
        let response = match self.transport.send(&descriptor).await {
            Ok(response) => response,
            Err(err) => {
                error!("{}", err);
                return Err(SpmError::PublishAborted {
                    message: err.to_string(),
                });
            }
        };

        let body = RegistryResponse::from_value(&response.body);
        match body.status.as_deref() {
            Some("success") | Some("info") => {}
            Some("error") => {
                let message = body.message_or_status();
                error!("{}", message);
                return Err(SpmError::PublishAborted { message });
            }
            status => {
                let message = body.message_or_status();
                body.severity().log(&message);
                return Err(SpmError::registry(status, message));
            }
        }

        let size = std::fs::metadata(&params.tarfile)
            .map_err(|e| SpmError::io_at(&params.tarfile, e))?
            .len();
        let artifact =
            std::fs::read(&params.tarfile).map_err(|e| SpmError::io_at(&params.tarfile, e))?;

        descriptor.prepare_upload(artifact, size);
        self.request(&descriptor).await
    }

    /// Look up package metadata and resolve its download link.
    ///
    /// Without a version the registry lists every version and the link is
    /// taken from the first one. An HTTP error or a body with status `error`
    /// yields [`SpmError::Registry`] carrying the body's message.
    pub async fn info(&self, id: &PackageId) -> RegistryResult<Reply> {
        let mut options = self.options.to_options();
        options.insert("root", id.root.as_str());
        options.insert("name", id.name.as_str());
        if let Some(version) = &id.version {
            options.insert("version", version.as_str());
        }
        options.insert("url", id.repository_path());

        let BuiltRequest { mut descriptor, .. } = build_request(options);
        descriptor.method = Method::GET;

        let versioned = id.version.is_some();
        let base_override = self.options.download_base.as_deref();

        self.dispatch(&descriptor, |outcome: RegistryResult<Reply>| -> RegistryResult<Reply> {
            let mut reply = outcome?;

            if reply.response.status >= 400 || reply.body.is_error() {
                let message = reply.body.message_or_status();
                error!("{}", message);
                return Err(SpmError::registry(reply.body.status.as_deref(), message));
            }

            if let Some(Value::Object(data)) = reply.body.data.as_mut() {
                let metadata = Value::Object(data.clone());
                if let Some(link) = resolve_download(&metadata, versioned, base_override) {
                    link.merge_into(data);
                }
            }
            Ok(reply)
        })
        .await
    }
}

#[cfg(test)]
mod tests;
