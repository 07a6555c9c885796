//! Hosted checkout and failed-payment handling against a stub gateway.
//!
//! Database-backed tests require `TEST_DATABASE_URL`; run with `-- --ignored`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use greenbasket_api::db::orders::OrderRepository;
use greenbasket_api::db::products::ProductRepository;
use greenbasket_api::models::order::{NewOrder, OrderItem};
use greenbasket_api::models::product::NewProduct;
use greenbasket_core::{AddressId, PaymentType, ProductId, UserId};
use greenbasket_integration_tests::{
    GatewayStub, TestApp, get_request, json_request, signed_webhook,
};

const CHECKOUT_URL: &str = "https://checkout.gateway.test/c/pay/cs_test_stub";

fn payment_failed(payment_intent: &str) -> String {
    json!({
        "id": "evt_failed",
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": payment_intent } }
    })
    .to_string()
}

#[tokio::test]
async fn test_failed_payment_looks_up_checkout_session() {
    let gateway = GatewayStub::start(
        None,
        json!([{ "id": "cs_1", "url": null, "metadata": { "orderId": "41", "userId": "7" } }]),
    )
    .await;
    let app = TestApp::offline_with_gateway(&gateway);

    let res = app.send(signed_webhook(&payment_failed("pi_123"))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json, json!({ "received": true }));

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].path, "/v1/checkout/sessions");
    assert_eq!(requests[0].query.as_deref(), Some("payment_intent=pi_123"));
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("Bearer sk_test_integration")
    );
}

#[tokio::test]
async fn test_failed_payment_without_session_is_acknowledged() {
    let gateway = GatewayStub::start(None, json!([])).await;
    let app = TestApp::offline_with_gateway(&gateway);

    let res = app.send(signed_webhook(&payment_failed("pi_unknown"))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json, json!({ "received": true }));
    assert_eq!(gateway.requests().len(), 1);
}

async fn insert_product(app: &TestApp, name: &str, offer_cents: i64) -> ProductId {
    let product = NewProduct {
        name: name.to_string(),
        description: vec![],
        category: "Fruits".to_string(),
        price: Decimal::new(offer_cents + 100, 2),
        offer_price: Decimal::new(offer_cents, 2),
        image: vec![],
        in_stock: true,
    };
    ProductRepository::new(&app.pool)
        .create(&product)
        .await
        .unwrap()
        .id
}

/// Register a shopper with one address and return `(user id, cookie, address)`.
async fn shopper(app: &TestApp) -> (UserId, String, AddressId) {
    let email = format!("payer-{}@greenbasket.test", Uuid::new_v4());
    let res = app
        .send(json_request(
            Method::POST,
            "/api/user/register",
            None,
            &json!({ "name": "Pat Payer", "email": email, "password": "fresh-greens-99" }),
        ))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    let user_id = UserId::new(i32::try_from(res.json["user"]["id"].as_i64().unwrap()).unwrap());
    let cookie = res.cookie("token").unwrap();

    let res = app
        .send(json_request(
            Method::POST,
            "/api/address/add",
            Some(&cookie),
            &json!({ "address": {
                "firstName": "Pat",
                "lastName": "Payer",
                "email": "pat@greenbasket.test",
                "street": "9 Orchard Road",
                "city": "Launceston",
                "state": "TAS",
                "zipcode": 7250,
                "country": "Australia",
                "phone": "0400000001"
            }}),
        ))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    let address =
        AddressId::new(i32::try_from(res.json["address"]["id"].as_i64().unwrap()).unwrap());

    (user_id, cookie, address)
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_online_order_returns_checkout_url() {
    let gateway = GatewayStub::start(Some(CHECKOUT_URL), json!([])).await;
    let app = TestApp::with_database_and_gateway(&gateway).await;
    let (user_id, cookie, address) = shopper(&app).await;
    let pears = insert_product(&app, "Pears", 1000).await;

    let mut request = json_request(
        Method::POST,
        "/api/order/stripe",
        Some(&cookie),
        &json!({ "items": [{ "product": pears, "quantity": 3 }], "address": address }),
    );
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://shop.greenbasket.test".parse().unwrap());
    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.json, json!({ "success": true, "url": CHECKOUT_URL }));

    let orders = app.send(get_request("/api/order/user", Some(&cookie))).await;
    let order = &orders.json["orders"][0];
    assert_eq!(order["paymentType"], "Online");
    assert_eq!(order["isPaid"], false);

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    let form = &requests[0];
    assert_eq!(form.method, Method::POST);
    assert_eq!(form.field("mode"), Some("payment"));
    assert_eq!(
        form.field("success_url"),
        Some("https://shop.greenbasket.test/loader?next=my-orders")
    );
    assert_eq!(
        form.field("cancel_url"),
        Some("https://shop.greenbasket.test/cart")
    );
    assert_eq!(
        form.field("metadata[orderId]"),
        Some(order["id"].to_string().as_str())
    );
    assert_eq!(
        form.field("metadata[userId]"),
        Some(user_id.to_string().as_str())
    );
    assert_eq!(
        form.field("line_items[0][price_data][product_data][name]"),
        Some("Pears")
    );
    // 10.00 * 1.02 in cents
    assert_eq!(
        form.field("line_items[0][price_data][unit_amount]"),
        Some("1020")
    );
    assert_eq!(form.field("line_items[0][quantity]"), Some("3"));
    assert_eq!(form.field("line_items[0][price_data][currency]"), Some("aud"));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_online_order_without_session_url_is_502() {
    let gateway = GatewayStub::start(None, json!([])).await;
    let app = TestApp::with_database_and_gateway(&gateway).await;
    let (_, cookie, address) = shopper(&app).await;
    let pears = insert_product(&app, "Pears", 1000).await;

    let res = app
        .send(json_request(
            Method::POST,
            "/api/order/stripe",
            Some(&cookie),
            &json!({ "items": [{ "product": pears }], "address": address }),
        ))
        .await;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        res.json,
        json!({ "success": false, "message": "Payment service error" })
    );
    assert_eq!(gateway.requests().len(), 1);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_failed_payment_deletes_order() {
    let setup = TestApp::with_database().await;
    let (user_id, cookie, address) = shopper(&setup).await;
    let plums = insert_product(&setup, "Plums", 400).await;
    let order = OrderRepository::new(&setup.pool)
        .create(&NewOrder {
            user_id,
            items: vec![OrderItem {
                product: plums,
                quantity: 1,
            }],
            amount: Decimal::new(408, 2),
            address,
            payment_type: PaymentType::Online,
        })
        .await
        .unwrap();

    let gateway = GatewayStub::start(
        None,
        json!([{
            "id": "cs_failed",
            "url": null,
            "metadata": { "orderId": order.id.to_string(), "userId": user_id.to_string() }
        }]),
    )
    .await;
    let app = TestApp::with_database_and_gateway(&gateway).await;

    let res = app.send(signed_webhook(&payment_failed("pi_declined"))).await;
    assert_eq!(res.json, json!({ "received": true }));
    assert_eq!(
        gateway.requests()[0].query.as_deref(),
        Some("payment_intent=pi_declined")
    );

    let res = app.send(get_request("/api/order/user", Some(&cookie))).await;
    assert_eq!(res.json["orders"], json!([]));
}
