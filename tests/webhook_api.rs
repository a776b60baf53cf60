//! The external-dns webhook HTTP surface, driven through the axum router.

mod common;

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::watch;
use tower::ServiceExt;

use common::{provider, remote, Call, FakeClient};
use synology_webhook::handlers::{router, AppState};

const WEBHOOK_CT: &str = "application/external.dns.webhook+json;version=1";

fn app(client: FakeClient, suffixes: &[&str]) -> (Router, watch::Sender<bool>) {
    let (tx, rx) = watch::channel(false);
    let state = AppState {
        provider: Arc::new(provider(client, suffixes, false)),
        shutdown: rx,
        request_timeout: Duration::from_secs(30),
    };
    (router(state), tx)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, content_type, json)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", WEBHOOK_CT)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn negotiation_returns_domain_filter() {
    let (app, _tx) = app(FakeClient::default(), &["example.com", "example.org"]);

    let (status, content_type, json) = send(app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(WEBHOOK_CT));
    assert_eq!(json, json!({"include": ["example.com", "example.org"], "exclude": []}));
}

#[tokio::test]
async fn get_records_lists_endpoints() {
    let client = FakeClient::with_records(vec![remote("host.example.com.", "A", "1.2.3.4")]);
    let (app, _tx) = app(client, &["example.com"]);

    let (status, content_type, json) = send(app, get("/records")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(WEBHOOK_CT));
    assert_eq!(
        json,
        json!([{"dnsName": "host.example.com", "recordType": "A", "targets": ["1.2.3.4"], "recordTTL": 3000}])
    );
}

#[tokio::test]
async fn get_records_reports_list_failure() {
    let client = FakeClient {
        fail_list: true,
        ..Default::default()
    };
    let (app, _tx) = app(client, &["example.com"]);

    let (status, _, json) = send(app, get("/records")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("119"));
}

#[tokio::test]
async fn post_records_applies_changes() {
    let client = FakeClient {
        fail_delete: vec!["9.9.9.9".into()],
        ..Default::default()
    };
    let (app, _tx) = app(client.clone(), &["example.com"]);
    let body = json!({
        "Create": [{"dnsName": "new.example.com", "recordType": "A", "targets": ["5.6.7.8"]}],
        "Delete": [{"dnsName": "old.example.com", "recordType": "A", "targets": ["9.9.9.9"]}],
        "UpdateOld": null,
        "UpdateNew": null
    });

    let (status, _, _) = send(app, post("/records", body)).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    let writes = client.writes();
    assert!(matches!(&writes[0], Call::Delete(r) if r.record == "old.example.com."));
    assert!(matches!(&writes[1], Call::Create(r) if r.record == "new.example.com." && r.ttl == "3000"));
}

#[tokio::test]
async fn post_records_rejects_unpaired_updates() {
    let client = FakeClient::default();
    let (app, _tx) = app(client.clone(), &["example.com"]);
    let body = json!({
        "UpdateNew": [{"dnsName": "a.example.com", "recordType": "A", "targets": ["1.1.1.1"]}]
    });

    let (status, _, json) = send(app, post("/records", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("updateOld"));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn post_records_after_shutdown_is_unavailable() {
    let client = FakeClient::default();
    let (app, tx) = app(client.clone(), &["example.com"]);
    tx.send(true).unwrap();
    let body = json!({
        "Create": [{"dnsName": "a.example.com", "recordType": "A", "targets": ["1.1.1.1"]}]
    });

    let (status, _, _) = send(app, post("/records", body)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn adjust_endpoints_drops_failed_targets() {
    let client = FakeClient {
        fail_create: vec!["10.0.0.2".into()],
        ..Default::default()
    };
    let (app, _tx) = app(client, &["example.com"]);
    let body = json!([
        {"dnsName": "rr.example.com", "recordType": "A", "targets": ["10.0.0.1", "10.0.0.2"], "recordTTL": 60}
    ]);

    let (status, content_type, json) = send(app, post("/adjustendpoints", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(WEBHOOK_CT));
    assert_eq!(
        json,
        json!([{"dnsName": "rr.example.com", "recordType": "A", "targets": ["10.0.0.1"], "recordTTL": 60}])
    );
}
