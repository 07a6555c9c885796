//! Payment webhook signature checks.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use serde_json::json;

use greenbasket_api::services::webhook::sign;
use greenbasket_integration_tests::{TestApp, TestResponse, WEBHOOK_SECRET};

fn signed_header(payload: &str, timestamp: i64) -> String {
    let signature = sign(WEBHOOK_SECRET, &timestamp.to_string(), payload.as_bytes()).unwrap();
    format!("t={timestamp},v1={signature}")
}

async fn deliver(app: &TestApp, payload: &str, signature: Option<&str>) -> TestResponse {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/stripe")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    app.send(builder.body(Body::from(payload.to_string())).unwrap())
        .await
}

#[tokio::test]
async fn test_missing_signature_header_is_400() {
    let app = TestApp::offline();
    let res = deliver(&app, "{}", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json["message"],
        "Webhook Error: Missing Stripe-Signature header"
    );
}

#[tokio::test]
async fn test_bad_signature_is_400() {
    let app = TestApp::offline();
    let payload = r#"{"id":"evt_1","type":"charge.refunded","data":{"object":{}}}"#;
    let header = format!("t={},v1=00ff", Utc::now().timestamp());

    let res = deliver(&app, payload, Some(&header)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json["message"],
        "Webhook Error: No signatures found matching the expected signature for payload"
    );
}

#[tokio::test]
async fn test_tampered_body_is_400() {
    let app = TestApp::offline();
    let original = r#"{"id":"evt_1","type":"charge.refunded","data":{"object":{}}}"#;
    let header = signed_header(original, Utc::now().timestamp());

    let res = deliver(&app, &original.replace("evt_1", "evt_2"), Some(&header)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stale_delivery_is_400() {
    let app = TestApp::offline();
    let payload = r#"{"id":"evt_1","type":"charge.refunded","data":{"object":{}}}"#;
    let header = signed_header(payload, Utc::now().timestamp() - 3600);

    let res = deliver(&app, payload, Some(&header)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json["message"],
        "Webhook Error: Timestamp outside the tolerance zone"
    );
}

#[tokio::test]
async fn test_signed_garbage_is_400() {
    let app = TestApp::offline();
    let payload = "not an event";
    let header = signed_header(payload, Utc::now().timestamp());

    let res = deliver(&app, payload, Some(&header)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(
        res.json["message"]
            .as_str()
            .unwrap()
            .starts_with("Webhook Error: Invalid payload")
    );
}

#[tokio::test]
async fn test_unhandled_event_is_acknowledged() {
    let app = TestApp::offline();
    let payload = r#"{"id":"evt_3","type":"charge.refunded","data":{"object":{"id":"ch_1"}}}"#;
    let header = signed_header(payload, Utc::now().timestamp());

    let res = deliver(&app, payload, Some(&header)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json, json!({ "received": true }));
}

#[tokio::test]
async fn test_completed_checkout_without_metadata_is_acknowledged() {
    let app = TestApp::offline();
    let payload = r#"{"id":"evt_4","type":"checkout.session.completed","data":{"object":{"id":"cs_1","metadata":{}}}}"#;
    let header = signed_header(payload, Utc::now().timestamp());

    let res = deliver(&app, payload, Some(&header)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json, json!({ "received": true }));
}
