//! Hosted checkout client for the payment gateway.
//!
//! Talks to the gateway's REST API directly: checkout sessions are created
//! with a form-encoded POST and looked up by payment intent when a payment
//! fails.

use std::collections::HashMap;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use greenbasket_core::{OrderId, UserId};

use crate::config::StripeConfig;

/// Metadata key carrying the order id on a checkout session.
pub const METADATA_ORDER_ID: &str = "orderId";
/// Metadata key carrying the buyer's user id on a checkout session.
pub const METADATA_USER_ID: &str = "userId";

/// Errors that can occur when interacting with the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build a request or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One line item of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    /// Product name shown on the checkout page.
    pub name: String,
    /// Per-unit amount in minor units.
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Everything needed to open a hosted checkout for an order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<CheckoutLine>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A checkout session as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Payment gateway API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    currency: String,
}

impl StripeClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(20))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
        })
    }

    /// Create a hosted checkout session for an order.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the response cannot be parsed.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = checkout_form(request, &self.currency);
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .form(&form)
            .send()
            .await?;

        let session: CheckoutSession = parse_response(response).await?;
        debug!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }

    /// List checkout sessions created for a payment intent.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn sessions_for_payment_intent(
        &self,
        payment_intent: &str,
    ) -> Result<Vec<CheckoutSession>, PaymentError> {
        let url = url::Url::parse_with_params(
            &format!("{}/v1/checkout/sessions", self.api_base),
            &[("payment_intent", payment_intent)],
        )
        .map_err(|e| PaymentError::Parse(format!("invalid gateway URL: {e}")))?;
        let response = self.client.get(url).send().await?;

        let list: ListResponse<CheckoutSession> = parse_response(response).await?;
        Ok(list.data)
    }
}

/// Form fields for a checkout session, in the gateway's bracketed key style.
fn checkout_form(request: &CheckoutRequest, currency: &str) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            format!("metadata[{METADATA_ORDER_ID}]"),
            request.order_id.to_string(),
        ),
        (
            format!("metadata[{METADATA_USER_ID}]"),
            request.user_id.to_string(),
        ),
    ];

    for (i, line) in request.lines.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[price_data][currency]"), currency.to_string()));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            line.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
    }

    form
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| PaymentError::Parse(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            order_id: OrderId::new(12),
            user_id: UserId::new(3),
            lines: vec![
                CheckoutLine {
                    name: "Organic Apples".into(),
                    unit_amount: 510,
                    quantity: 2,
                },
                CheckoutLine {
                    name: "Oat Milk".into(),
                    unit_amount: 357,
                    quantity: 1,
                },
            ],
            success_url: "https://greenbasket.shop/loader?next=my-orders".into(),
            cancel_url: "https://greenbasket.shop/cart".into(),
        }
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_checkout_form_fields() {
        let form = checkout_form(&request(), "aud");
        assert_eq!(field(&form, "mode"), Some("payment"));
        assert_eq!(field(&form, "metadata[orderId]"), Some("12"));
        assert_eq!(field(&form, "metadata[userId]"), Some("3"));
        assert_eq!(
            field(&form, "line_items[0][price_data][unit_amount]"),
            Some("510")
        );
        assert_eq!(
            field(&form, "line_items[1][price_data][product_data][name]"),
            Some("Oat Milk")
        );
        assert_eq!(field(&form, "line_items[1][quantity]"), Some("1"));
        assert_eq!(
            field(&form, "line_items[0][price_data][currency]"),
            Some("aud")
        );
    }

    #[test]
    fn test_checkout_session_parses_list() {
        let json = r#"{"object":"list","data":[{"id":"cs_test_1","url":null,"metadata":{"orderId":"12","userId":"3"}}]}"#;
        let list: ListResponse<CheckoutSession> = serde_json::from_str(json).unwrap();
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].metadata[METADATA_ORDER_ID], "12");
        assert!(list.data[0].url.is_none());
    }
}
