//! Unit tests for registry client

use super::*;

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::request::Payload;

/// Replays canned responses and records every request it was given
struct ScriptedTransport {
    replies: Mutex<VecDeque<RegistryResult<TransportResponse>>>,
    seen: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    fn replying(replies: Vec<RegistryResult<TransportResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<RequestDescriptor> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> RegistryResult<TransportResponse> {
        self.seen.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left")
    }
}

fn ok(status: u16, body: Value) -> RegistryResult<TransportResponse> {
    Ok(TransportResponse {
        status,
        headers: BTreeMap::new(),
        body,
    })
}

fn offline() -> RegistryResult<TransportResponse> {
    Err(SpmError::Network {
        message: "connection refused".to_string(),
        source: None,
    })
}

fn test_options() -> ClientOptions {
    ClientOptions {
        auth: Some("tok123".to_string()),
        lang: Some("en_US".to_string()),
        ..ClientOptions::new("https://x.test/")
    }
}

fn scripted_client(
    replies: Vec<RegistryResult<TransportResponse>>,
) -> (RegistryClient<Arc<ScriptedTransport>>, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::replying(replies);
    let client = RegistryClient::with_transport(test_options(), transport.clone());
    (client, transport)
}

fn record_events(client: &mut RegistryClient<Arc<ScriptedTransport>>) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    client.subscribe(move |event| sink.lock().unwrap().push(event.name().to_string()));
    log
}

fn publish_params(tarfile: impl Into<PathBuf>) -> PublishParams {
    PublishParams::new(&PackageId::new("arale", "base").with_version("1.0.0"), tarfile)
}

#[test]
fn test_client_options_to_options() {
    let mut options = ClientOptions {
        force: true,
        download_base: Some("http://cdn.test/".to_string()),
        ..test_options()
    };
    options.extra.insert("source".to_string(), json!("cli"));

    let bag = options.to_options();
    assert_eq!(bag.get_str("server"), Some("https://x.test/"));
    assert_eq!(bag.get_str("auth"), Some("tok123"));
    assert_eq!(bag.get("force"), Some(&json!(true)));
    assert_eq!(bag.get_str("download_base"), Some("http://cdn.test/"));
    assert_eq!(bag.get_str("source"), Some("cli"));
    assert!(!bag.contains_key("proxy"));
}

#[tokio::test]
async fn test_events_on_success_end_after_completion() {
    let (mut client, _) = scripted_client(vec![ok(
        200,
        json!({ "status": "success", "message": "hi" }),
    )]);
    let log = record_events(&mut client);

    let descriptor = build_request(Options::new().with("url", "ping")).descriptor;
    let sink = log.clone();
    let reply = client
        .dispatch(&descriptor, move |outcome| {
            sink.lock().unwrap().push("complete".to_string());
            outcome
        })
        .await
        .unwrap();

    assert_eq!(reply.body.message.as_deref(), Some("hi"));
    assert_eq!(*log.lock().unwrap(), vec!["data", "response", "complete", "end"]);
}

#[tokio::test]
async fn test_events_on_transport_error() {
    let (mut client, _) = scripted_client(vec![offline()]);
    let log = record_events(&mut client);

    let descriptor = build_request(Options::new().with("url", "ping")).descriptor;
    let sink = log.clone();
    let result = client
        .dispatch(&descriptor, move |outcome| {
            sink.lock().unwrap().push("complete".to_string());
            outcome
        })
        .await;

    assert!(result.unwrap_err().is_transport());
    assert_eq!(*log.lock().unwrap(), vec!["error", "complete", "end"]);
}

#[tokio::test]
async fn test_login_with_email_only() {
    let (client, transport) = scripted_client(vec![ok(
        200,
        json!({ "status": "success", "data": "token" }),
    )]);

    let params = LoginParams {
        email: Some("a@b.com".to_string()),
        ..LoginParams::default()
    };
    let reply = client.login(&params).await.unwrap();
    assert_eq!(reply.body.data, Some(json!("token")));

    let seen = transport.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].url, "https://x.test/account/login");
    assert_eq!(seen[0].header("Authorization"), Some("Yuan tok123"));

    let payload = seen[0].json().unwrap();
    assert_eq!(payload["account"], "a@b.com");
    assert_eq!(payload["email"], "a@b.com");
    assert!(payload.get("auth").is_none());
    assert!(payload.get("lang").is_none());
}

#[tokio::test]
async fn test_login_account_precedence() {
    let (client, transport) = scripted_client(vec![ok(200, json!({ "status": "success" }))]);

    let params = LoginParams {
        account: None,
        username: Some("alice".to_string()),
        email: Some("a@b.com".to_string()),
        password: Some("secret".to_string()),
    };
    client.login(&params).await.unwrap();

    let payload = transport.seen()[0].json().unwrap().clone();
    assert_eq!(payload["account"], "alice");
    assert_eq!(payload["password"], "secret");
}

#[tokio::test]
async fn test_login_requires_identifier() {
    let (client, transport) = scripted_client(vec![]);

    let err = client.login(&LoginParams::default()).await.unwrap_err();
    assert!(matches!(err, SpmError::ConfigValidation { .. }));
    assert!(transport.seen().is_empty());
}

#[tokio::test]
async fn test_login_error_status_is_returned_not_raised() {
    let (client, _) = scripted_client(vec![ok(
        200,
        json!({ "status": "error", "message": "bad password" }),
    )]);

    let params = LoginParams {
        account: Some("alice".to_string()),
        ..LoginParams::default()
    };
    let reply = client.login(&params).await.unwrap();
    assert_eq!(reply.failure(), Some("bad password".to_string()));
}

#[tokio::test]
async fn test_publish_error_status_aborts_before_upload() {
    let (mut client, transport) = scripted_client(vec![ok(
        200,
        json!({ "status": "error", "message": "nope" }),
    )]);
    let log = record_events(&mut client);

    // the artifact does not exist, so any attempt to read it would surface as an IO error
    let err = client.publish(&publish_params("/nonexistent/base-1.0.0.tar.gz")).await.unwrap_err();

    match &err {
        SpmError::PublishAborted { message } => assert_eq!(message, "nope"),
        other => panic!("Expected PublishAborted, got {:?}", other),
    }
    assert!(err.is_fatal());
    assert_eq!(transport.seen().len(), 1);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_transport_error_aborts() {
    let (client, transport) = scripted_client(vec![offline()]);

    let err = client.publish(&publish_params("/nonexistent/base.tar.gz")).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(transport.seen().len(), 1);
}

#[tokio::test]
async fn test_publish_other_status_is_soft_stop() {
    let (client, transport) = scripted_client(vec![ok(
        200,
        json!({ "status": "warn", "message": "version exists" }),
    )]);

    let err = client.publish(&publish_params("/nonexistent/base.tar.gz")).await.unwrap_err();
    match err {
        SpmError::Registry { status, message } => {
            assert_eq!(status.as_deref(), Some("warn"));
            assert_eq!(message, "version exists");
        }
        other => panic!("Expected Registry error, got {:?}", other),
    }
    assert_eq!(transport.seen().len(), 1);
}

#[tokio::test]
async fn test_publish_success_uploads_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let tarfile = dir.path().join("base-1.0.0.tar.gz");
    std::fs::write(&tarfile, b"not really gzip but bytes all the same").unwrap();
    let size = std::fs::metadata(&tarfile).unwrap().len();

    let (mut client, transport) = scripted_client(vec![
        ok(200, json!({ "status": "success" })),
        ok(200, json!({ "status": "success", "message": "published" })),
    ]);
    let log = record_events(&mut client);

    let mut params = publish_params(&tarfile);
    params.metadata.insert("description".to_string(), json!("base utilities"));
    let reply = client.publish(&params).await.unwrap();
    assert_eq!(reply.body.message.as_deref(), Some("published"));

    let seen = transport.seen();
    assert_eq!(seen.len(), 2);

    let register = &seen[0];
    assert_eq!(register.method, Method::POST);
    assert_eq!(register.url, "https://x.test/repository/arale/base/1.0.0");
    let payload = register.json().unwrap();
    assert_eq!(payload["root"], "arale");
    assert_eq!(payload["description"], "base utilities");
    assert_eq!(payload["tarfile"].as_str(), tarfile.to_str());

    let upload = &seen[1];
    assert_eq!(upload.method, Method::PUT);
    assert_eq!(upload.url, register.url);
    assert!(upload.json().is_none());
    assert_eq!(upload.header("content-length"), Some(size.to_string().as_str()));
    assert_eq!(upload.header("content-type"), Some("application/x-tar-gz"));
    assert_eq!(upload.header("Authorization"), Some("Yuan tok123"));
    assert!(matches!(&upload.payload, Payload::Body(bytes) if bytes.len() as u64 == size));

    // only the upload goes through the event path
    assert_eq!(*log.lock().unwrap(), vec!["data", "response", "end"]);
}

#[tokio::test]
async fn test_publish_info_status_also_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let tarfile = dir.path().join("base.tar.gz");
    std::fs::write(&tarfile, b"bytes").unwrap();

    let (client, transport) = scripted_client(vec![
        ok(200, json!({ "status": "info", "message": "updating" })),
        ok(200, json!({ "status": "success" })),
    ]);

    client.publish(&publish_params(&tarfile)).await.unwrap();
    assert_eq!(transport.seen()[1].method, Method::PUT);
}

#[tokio::test]
async fn test_publish_missing_artifact_after_registration() {
    let (client, transport) = scripted_client(vec![ok(200, json!({ "status": "success" }))]);

    let err = client.publish(&publish_params("/nonexistent/base.tar.gz")).await.unwrap_err();
    assert!(matches!(err, SpmError::Io { .. }));
    assert!(!err.is_fatal());
    assert_eq!(transport.seen().len(), 1);
}

#[tokio::test]
async fn test_publish_requires_version() {
    let (client, transport) = scripted_client(vec![]);

    let params = PublishParams::new(&PackageId::new("arale", "base"), "/tmp/base.tar.gz");
    let err = client.publish(&params).await.unwrap_err();
    assert!(matches!(err, SpmError::ConfigValidation { ref field, .. } if field == "version"));
    assert!(transport.seen().is_empty());
}

#[tokio::test]
async fn test_info_versioned_resolves_download() {
    let (client, transport) = scripted_client(vec![ok(200, json!({
        "status": "success",
        "data": {
            "name": "base",
            "version": "1.0.0",
            "download_url": "arale/base/1.0.0/base-1.0.0.tar.gz",
            "download_base": "http://cdn.test/",
        },
    }))]);

    let reply = client.info(&PackageId::new("arale", "base").with_version("1.0.0")).await.unwrap();
    let data = reply.body.data.unwrap();
    assert_eq!(data["download"], "http://cdn.test/arale/base/1.0.0/base-1.0.0.tar.gz");
    assert_eq!(data["download_url"], "arale/base/1.0.0/base-1.0.0.tar.gz");
    assert_eq!(data["name"], "base");

    let seen = transport.seen();
    assert_eq!(seen[0].method, Method::GET);
    assert_eq!(seen[0].url, "https://x.test/repository/arale/base/1.0.0");
}

#[tokio::test]
async fn test_info_listing_reads_first_package() {
    let (client, transport) = scripted_client(vec![ok(200, json!({
        "status": "success",
        "data": {
            "download_base": "http://cdn.test",
            "packages": [
                { "version": "1.1.0", "download_url": "base-1.1.0.tar.gz" },
                { "version": "1.0.0", "download_url": "base-1.0.0.tar.gz" },
            ],
        },
    }))]);

    let reply = client.info(&PackageId::new("arale", "base")).await.unwrap();
    let data = reply.body.data.unwrap();
    assert_eq!(data["download"], "http://cdn.test/base-1.1.0.tar.gz");
    assert_eq!(transport.seen()[0].url, "https://x.test/repository/arale/base/");
}

#[tokio::test]
async fn test_info_download_base_override() {
    let transport = ScriptedTransport::replying(vec![ok(200, json!({
        "status": "success",
        "data": { "download_url": "base.tar.gz", "download_base": "http://cdn.test/" },
    }))]);
    let options = ClientOptions {
        download_base: Some("https://mirror.test/".to_string()),
        ..test_options()
    };
    let client = RegistryClient::with_transport(options, transport);

    let reply = client.info(&PackageId::new("arale", "base").with_version("1.0.0")).await.unwrap();
    let data = reply.body.data.unwrap();
    assert_eq!(data["download"], "https://mirror.test/base.tar.gz");
    assert_eq!(data["download_base"], "https://mirror.test/");
}

#[tokio::test]
async fn test_info_http_error_uses_body_message() {
    let (mut client, _) = scripted_client(vec![ok(
        404,
        json!({ "status": "error", "message": "package not found" }),
    )]);
    let log = record_events(&mut client);

    let err = client.info(&PackageId::new("arale", "missing")).await.unwrap_err();
    match err {
        SpmError::Registry { message, .. } => assert_eq!(message, "package not found"),
        other => panic!("Expected Registry error, got {:?}", other),
    }
    assert_eq!(*log.lock().unwrap(), vec!["data", "response", "end"]);
}

#[tokio::test]
async fn test_info_error_status_with_ok_http() {
    let (mut client, _) = scripted_client(vec![ok(
        200,
        json!({ "status": "error", "message": "package not found" }),
    )]);
    let log = record_events(&mut client);

    let err = client.info(&PackageId::new("arale", "missing")).await.unwrap_err();
    match err {
        SpmError::Registry { status, message } => {
            assert_eq!(status.as_deref(), Some("error"));
            assert_eq!(message, "package not found");
        }
        other => panic!("Expected Registry error, got {:?}", other),
    }
    assert_eq!(*log.lock().unwrap(), vec!["data", "response", "end"]);
}

#[tokio::test]
async fn test_info_transport_error() {
    let (client, _) = scripted_client(vec![offline()]);

    let err = client.info(&PackageId::new("arale", "base")).await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_login_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/account/login"))
        .and(header("Authorization", "Yuan tok123"))
        .and(header("X-Yuan-Force", "true"))
        .and(body_json(json!({
            "server": mock_server.uri(),
            "account": "alice",
            "password": "secret",
            "url": "account/login",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "welcome back",
            "data": "new-token",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = ClientOptions {
        auth: Some("tok123".to_string()),
        force: true,
        ..ClientOptions::new(mock_server.uri())
    };
    let client = RegistryClient::new(options).unwrap();

    let params = LoginParams {
        account: Some("alice".to_string()),
        password: Some("secret".to_string()),
        ..LoginParams::default()
    };
    let reply = client.login(&params).await.unwrap();
    assert_eq!(reply.response.status, 200);
    assert_eq!(reply.body.data, Some(json!("new-token")));
}

#[tokio::test]
async fn test_publish_over_http() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let tarfile = dir.path().join("base.tar.gz");
    std::fs::write(&tarfile, b"artifact").unwrap();

    Mock::given(method("POST"))
        .and(path("/repository/arale/base/1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/repository/arale/base/1.0.0"))
        .and(header("content-type", "application/x-tar-gz"))
        .and(header("content-length", "8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "arale/base@1.0.0 published",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = RegistryClient::new(ClientOptions::new(mock_server.uri())).unwrap();
    let reply = client.publish(&publish_params(&tarfile)).await.unwrap();
    assert_eq!(reply.body.message.as_deref(), Some("arale/base@1.0.0 published"));
}

#[tokio::test]
async fn test_info_not_found_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repository/arale/missing/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": "error",
            "message": "arale/missing not found",
        })))
        .mount(&mock_server)
        .await;

    let client = RegistryClient::new(ClientOptions::new(mock_server.uri())).unwrap();
    let err = client.info(&PackageId::new("arale", "missing")).await.unwrap_err();
    assert_eq!(err.to_string(), "Registry error: arale/missing not found");
}
