//! Order placement and history routes.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::ORIGIN},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use greenbasket_core::pricing::{PricedLine, order_amount, unit_amount_minor};
use greenbasket_core::{AddressId, PaymentType, UserId};

use crate::db::addresses::AddressRepository;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::error::{ApiJson, AppError, Result};
use crate::middleware::{RequireSeller, RequireUser};
use crate::models::order::{NewOrder, Order, OrderItem};
use crate::models::product::Product;
use crate::services::payments::{CheckoutLine, CheckoutRequest, PaymentError};
use crate::state::AppState;

const INVALID_ORDER: &str = "Invalid order data";

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub address: Option<AddressId>,
}

/// An order that has passed validation and been priced.
struct PreparedOrder {
    order: NewOrder,
    /// Products in the same order as `order.items`.
    products: Vec<Product>,
}

/// `POST /api/order/cod`
#[instrument(skip(state, body))]
pub async fn place_cod(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<Json<Value>> {
    let prepared = prepare_order(&state, user_id, body, PaymentType::CashOnDelivery).await?;
    let order = OrderRepository::new(state.pool())
        .create(&prepared.order)
        .await?;
    info!(order_id = %order.id, amount = %order.amount, "COD order placed");

    Ok(Json(json!({
        "success": true,
        "message": "Order Placed Successfully",
    })))
}

/// `POST /api/order/stripe`
///
/// Persists the order as unpaid, then opens a hosted checkout for it. The
/// order is settled later by the payment webhook.
#[instrument(skip(state, headers, body))]
pub async fn place_online(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    headers: HeaderMap,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<Json<Value>> {
    let prepared = prepare_order(&state, user_id, body, PaymentType::Online).await?;
    let order = OrderRepository::new(state.pool())
        .create(&prepared.order)
        .await?;
    info!(order_id = %order.id, amount = %order.amount, "Online order placed");

    let origin = request_origin(&headers, &state.config().client_url);
    let request = checkout_request(&order, &prepared.products, &origin)?;
    let session = state
        .stripe()
        .create_checkout_session(&request)
        .await
        .inspect_err(|e| warn!(order_id = %order.id, error = %e, "Checkout session failed"))?;

    let url = session
        .url
        .ok_or_else(|| PaymentError::Parse("checkout session has no url".to_string()))?;

    Ok(Json(json!({ "success": true, "url": url })))
}

/// `GET /api/order/user`
#[instrument(skip(state))]
pub async fn user_orders(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Value>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user_id)
        .await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

/// `GET /api/order/seller`
#[instrument(skip(state))]
pub async fn all_orders(
    State(state): State<AppState>,
    _seller: RequireSeller,
) -> Result<Json<Value>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

/// Validate the request and price it against current product data.
async fn prepare_order(
    state: &AppState,
    user_id: UserId,
    body: PlaceOrderRequest,
    payment_type: PaymentType,
) -> Result<PreparedOrder> {
    let address = body
        .address
        .ok_or_else(|| AppError::BadRequest(INVALID_ORDER.to_string()))?;
    if body.items.is_empty() || body.items.iter().any(|item| item.quantity == 0) {
        return Err(AppError::BadRequest(INVALID_ORDER.to_string()));
    }

    if !AddressRepository::new(state.pool())
        .is_owned_by(address, user_id)
        .await?
    {
        return Err(AppError::BadRequest(INVALID_ORDER.to_string()));
    }

    let ids: Vec<_> = body.items.iter().map(|item| item.product).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;

    let (items, products) = resolve_items(body.items, &products);
    if items.is_empty() {
        return Err(AppError::BadRequest(INVALID_ORDER.to_string()));
    }

    let lines: Vec<PricedLine> = items
        .iter()
        .zip(&products)
        .map(|(item, product)| PricedLine::new(product.offer_price, item.quantity))
        .collect();

    Ok(PreparedOrder {
        order: NewOrder {
            user_id,
            items,
            amount: order_amount(&lines),
            address,
            payment_type,
        },
        products,
    })
}

/// Pair each requested item with its product, dropping unknown products.
fn resolve_items(items: Vec<OrderItem>, products: &[Product]) -> (Vec<OrderItem>, Vec<Product>) {
    items
        .into_iter()
        .filter_map(|item| {
            products
                .iter()
                .find(|p| p.id == item.product)
                .map(|p| (item, p.clone()))
        })
        .unzip()
}

/// `Origin` header if present, else the configured storefront URL.
fn request_origin(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && *v != "null")
        .unwrap_or(fallback)
        .trim_end_matches('/')
        .to_string()
}

fn checkout_request(order: &Order, products: &[Product], origin: &str) -> Result<CheckoutRequest> {
    let lines = order
        .items
        .iter()
        .zip(products)
        .map(|(item, product)| {
            Ok(CheckoutLine {
                name: product.name.clone(),
                unit_amount: unit_amount_minor(product.offer_price)
                    .map_err(|e| AppError::Internal(e.to_string()))?,
                quantity: item.quantity,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CheckoutRequest {
        order_id: order.id,
        user_id: order.user_id,
        lines,
        success_url: format!("{origin}/loader?next=my-orders"),
        cancel_url: format!("{origin}/cart"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use greenbasket_core::{OrderId, ProductId};

    use super::*;

    fn product(id: i32, name: &str, offer_cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: vec![],
            category: "Fruits".to_string(),
            price: Decimal::new(offer_cents + 100, 2),
            offer_price: Decimal::new(offer_cents, 2),
            image: vec![],
            in_stock: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(product: i32, quantity: u32) -> OrderItem {
        OrderItem {
            product: ProductId::new(product),
            quantity,
        }
    }

    #[test]
    fn test_resolve_items_drops_unknown_products() {
        let products = vec![product(1, "Apples", 500), product(2, "Milk", 350)];
        let (items, matched) = resolve_items(vec![item(2, 1), item(99, 4), item(1, 3)], &products);

        assert_eq!(items, vec![item(2, 1), item(1, 3)]);
        assert_eq!(matched[0].name, "Milk");
        assert_eq!(matched[1].name, "Apples");
    }

    #[test]
    fn test_request_origin_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("https://shop.example/"));
        assert_eq!(
            request_origin(&headers, "http://localhost:5173"),
            "https://shop.example"
        );
    }

    #[test]
    fn test_request_origin_falls_back() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            request_origin(&headers, "http://localhost:5173/"),
            "http://localhost:5173"
        );
        headers.insert(ORIGIN, HeaderValue::from_static("null"));
        assert_eq!(
            request_origin(&headers, "http://localhost:5173"),
            "http://localhost:5173"
        );
    }

    #[test]
    fn test_checkout_request_lines() {
        let order = Order {
            id: OrderId::new(12),
            user_id: UserId::new(3),
            items: vec![item(1, 2)],
            amount: Decimal::from(10),
            address: AddressId::new(1),
            payment_type: PaymentType::Online,
            is_paid: false,
            status: "Pending".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let request = checkout_request(&order, &[product(1, "Apples", 500)], "https://shop.example").unwrap();

        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].unit_amount, 510);
        assert_eq!(request.lines[0].quantity, 2);
        assert_eq!(request.success_url, "https://shop.example/loader?next=my-orders");
        assert_eq!(request.cancel_url, "https://shop.example/cart");
        assert_eq!(request.order_id, OrderId::new(12));
    }
}
