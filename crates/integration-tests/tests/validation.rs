//! Request validation that happens before any database access.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use greenbasket_core::UserId;
use greenbasket_integration_tests::{TestApp, get_request, json_request};

#[tokio::test]
async fn test_health() {
    let app = TestApp::offline();
    let res = app.send(get_request("/health", None)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.text, "ok");
}

#[tokio::test]
async fn test_readiness_without_database() {
    let app = TestApp::offline();
    let res = app.send(get_request("/health/ready", None)).await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::offline();
    let mut request = get_request("/health", None);
    request
        .headers_mut()
        .insert("x-request-id", "it-req-42".parse().unwrap());

    let res = app.send(request).await;
    assert_eq!(res.headers["x-request-id"], "it-req-42");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = TestApp::offline();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/seller/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json["success"], false);
    assert!(res.json["message"].is_string());
}

#[tokio::test]
async fn test_user_login_requires_fields() {
    let app = TestApp::offline();
    let res = app
        .send(json_request(
            Method::POST,
            "/api/user/login",
            None,
            &json!({ "email": "", "password": "" }),
        ))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json["message"], "Email and password are required");
}

#[tokio::test]
async fn test_cart_update_requires_cart_items() {
    let app = TestApp::offline();
    let cookie = app.user_cookie(UserId::new(1));
    let res = app
        .send(json_request(Method::POST, "/api/cart/update", Some(&cookie), &json!({})))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json["message"], "cartItems is required");
}

#[tokio::test]
async fn test_cart_update_rejects_negative_quantities() {
    let app = TestApp::offline();
    let cookie = app.user_cookie(UserId::new(1));
    let res = app
        .send(json_request(
            Method::POST,
            "/api/cart/update",
            Some(&cookie),
            &json!({ "cartItems": { "3": -1 } }),
        ))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_address_add_requires_address() {
    let app = TestApp::offline();
    let cookie = app.user_cookie(UserId::new(1));
    let res = app
        .send(json_request(Method::POST, "/api/address/add", Some(&cookie), &json!({})))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json["message"], "address is required");
}

#[tokio::test]
async fn test_order_without_items_or_address_is_invalid() {
    let app = TestApp::offline();
    let cookie = app.user_cookie(UserId::new(1));

    let bodies = [
        json!({ "items": [], "address": 1 }),
        json!({ "items": [{ "product": 1, "quantity": 2 }] }),
        json!({ "items": [{ "product": 1, "quantity": 0 }], "address": 1 }),
    ];

    for body in &bodies {
        for uri in ["/api/order/cod", "/api/order/stripe"] {
            let res = app
                .send(json_request(Method::POST, uri, Some(&cookie), body))
                .await;
            assert_eq!(res.status, StatusCode::BAD_REQUEST, "{uri} {body}");
            assert_eq!(res.json["message"], "Invalid order data");
        }
    }
}

#[tokio::test]
async fn test_product_add_requires_seller() {
    let app = TestApp::offline();
    let cookie = app.user_cookie(UserId::new(1));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/product/add")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
        .body(Body::from("--X--\r\n"))
        .unwrap();

    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_product_add_requires_product_data() {
    let app = TestApp::offline();
    let cookie = app.seller_cookie(greenbasket_integration_tests::SELLER_EMAIL);
    let body = "--X\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--X--\r\n";
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/product/add")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
        .body(Body::from(body))
        .unwrap();

    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json["message"], "productData is required");
}

#[tokio::test]
async fn test_product_add_rejects_non_image_files() {
    let app = TestApp::offline();
    let cookie = app.seller_cookie(greenbasket_integration_tests::SELLER_EMAIL);
    let body = concat!(
        "--X\r\n",
        "Content-Disposition: form-data; name=\"images\"; filename=\"notes.txt\"\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "hello\r\n",
        "--X--\r\n",
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/product/add")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
        .body(Body::from(body))
        .unwrap();

    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json["message"], "images must be image files");
}

fn product_upload(cookie: &str, product_data: &str) -> Request<Body> {
    let body = format!(
        "--X\r\n\
         Content-Disposition: form-data; name=\"productData\"\r\n\r\n\
         {product_data}\r\n\
         --X\r\n\
         Content-Disposition: form-data; name=\"images\"; filename=\"apple.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         not-really-a-png\r\n\
         --X--\r\n"
    );
    Request::builder()
        .method(Method::POST)
        .uri("/api/product/add")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_product_add_invalid_product_stores_no_images() {
    let app = TestApp::offline();
    let cookie = app.seller_cookie(greenbasket_integration_tests::SELLER_EMAIL);
    let product = r#"{"name":"  ","category":"Fruits","price":5,"offerPrice":4}"#;

    let res = app.send(product_upload(&cookie, product)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json["message"], "name is required");
    assert!(app.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_product_add_failed_insert_removes_images() {
    let app = TestApp::offline();
    let cookie = app.seller_cookie(greenbasket_integration_tests::SELLER_EMAIL);
    let product = r#"{"name":"Apple","category":"Fruits","price":5,"offerPrice":4}"#;

    let res = app.send(product_upload(&cookie, product)).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::offline();
    let res = app.send(get_request("/api/nope", None)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
