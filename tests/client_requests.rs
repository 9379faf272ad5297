//! Request-shape tests for SignClient against a recording stand-in server.

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use docsign::{Document, SignClient, SignError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Field {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    body: Vec<u8>,
    fields: Vec<Field>,
}

#[derive(Clone)]
enum Reply {
    Json(StatusCode, Value),
    Text(StatusCode, &'static str),
}

#[derive(Clone)]
struct Stub {
    log: Arc<Mutex<Vec<Recorded>>>,
    reply: Reply,
}

impl Stub {
    fn respond(&self) -> Response {
        match &self.reply {
            Reply::Json(status, value) => (*status, Json(value.clone())).into_response(),
            Reply::Text(status, text) => (*status, *text).into_response(),
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }
}

async fn record_raw(State(stub): State<Stub>, uri: Uri, body: Bytes) -> Response {
    stub.log.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        body: body.to_vec(),
        fields: Vec::new(),
    });
    stub.respond()
}

async fn record_multipart(State(stub): State<Stub>, uri: Uri, mut multipart: Multipart) -> Response {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        fields.push(Field {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    stub.log.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        body: Vec::new(),
        fields,
    });
    stub.respond()
}

async fn start_stub(reply: Reply) -> (Stub, SignClient) {
    let stub = Stub {
        log: Arc::new(Mutex::new(Vec::new())),
        reply,
    };
    let app = Router::new()
        .route("/users/:user_id/keys", post(record_raw))
        .route("/sign", post(record_multipart))
        .route("/verify", post(record_multipart))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = SignClient::new(&format!("http://{}", addr)).unwrap();
    (stub, client)
}

fn ok(value: Value) -> Reply {
    Reply::Json(StatusCode::OK, value)
}

#[tokio::test]
async fn test_generate_keys_posts_once_with_empty_body() {
    let (stub, client) = start_stub(ok(json!({"message": "created"}))).await;

    let response = client.generate_keys("alice").await.unwrap();
    assert_eq!(response, json!({"message": "created"}));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/users/alice/keys");
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_dot_user_ids_are_not_sent() {
    let (stub, client) = start_stub(ok(json!({"message": "created"}))).await;

    for user_id in [".", ".."] {
        let err = client.generate_keys(user_id).await.unwrap_err();
        assert!(matches!(err, SignError::InvalidFormat(_)));
    }
    client.generate_keys("alice").await.unwrap();

    let paths: Vec<String> = stub.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, ["/users/alice/keys"]);
}

#[tokio::test]
async fn test_sign_sends_exactly_three_fields() {
    let (stub, client) = start_stub(ok(json!({"signed": true}))).await;

    let document = Document::from("document body").with_filename("doc.txt");
    client.sign_document("bob", document, "BASE64").await.unwrap();

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/sign");

    let fields = &requests[0].fields;
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["user_id", "document", "signature_base64"]);

    assert_eq!(fields[0].bytes, b"bob");
    assert!(fields[0].file_name.is_none());
    assert_eq!(fields[1].bytes, b"document body");
    assert_eq!(fields[1].file_name.as_deref(), Some("doc.txt"));
    assert_eq!(fields[2].bytes, b"BASE64");
}

#[tokio::test]
async fn test_verify_sends_package_as_json_blob() {
    let (stub, client) = start_stub(ok(json!({"valid": true}))).await;

    client
        .verify_signature(Document::from("document body"), &json!({"foo": "bar"}), "BASE64")
        .await
        .unwrap();

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/verify");

    let fields = &requests[0].fields;
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["document", "signed_package", "signature_base64"]);

    let package = &fields[1];
    assert!(package.file_name.is_some());
    assert_eq!(package.content_type.as_deref(), Some("application/json"));
    let parsed: Value = serde_json::from_slice(&package.bytes).unwrap();
    assert_eq!(parsed, json!({"foo": "bar"}));

    assert_eq!(fields[0].bytes, b"document body");
    assert_eq!(fields[2].bytes, b"BASE64");
}

#[tokio::test]
async fn test_error_status_body_returned_unmodified_without_retry() {
    let body = json!({"detail": "boom", "nested": [1, {"x": null}]});
    let (stub, client) =
        start_stub(Reply::Json(StatusCode::INTERNAL_SERVER_ERROR, body.clone())).await;

    assert_eq!(client.generate_keys("alice").await.unwrap(), body);
    assert_eq!(
        client
            .sign_document("alice", Document::from("doc"), "BASE64")
            .await
            .unwrap(),
        body
    );
    assert_eq!(
        client
            .verify_signature(Document::from("doc"), &json!({}), "BASE64")
            .await
            .unwrap(),
        body
    );

    // one request per call, no retries
    assert_eq!(stub.requests().len(), 3);
}

#[tokio::test]
async fn test_non_json_body_is_an_error() {
    let (stub, client) = start_stub(Reply::Text(StatusCode::OK, "not json")).await;

    let err = client.generate_keys("alice").await.unwrap_err();
    assert!(matches!(err, SignError::Http(_)));
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SignClient::new(&format!("http://{}", addr)).unwrap();
    let err = client.generate_keys("alice").await.unwrap_err();
    assert!(matches!(err, SignError::Http(_)));
}
