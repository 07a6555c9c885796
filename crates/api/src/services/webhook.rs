//! Payment gateway webhook verification and interpretation.
//!
//! The gateway signs each delivery with
//! `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]` where each `v1` is
//! `HMAC-SHA256(secret, "{t}.{raw body}")`. Interpretation is kept free of
//! I/O: [`WebhookAction::from_event`] decides what to do and the route
//! applies it.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use greenbasket_core::{OrderId, UserId};

use super::auth::constant_time_compare;
use super::payments::{METADATA_ORDER_ID, METADATA_USER_ID};

/// Maximum age of a signed delivery, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Event type of a completed hosted checkout.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
/// Event type of a failed payment attempt.
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Errors from verifying or interpreting a webhook delivery.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("No signatures found matching the expected signature for payload")]
    SignatureMismatch,

    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error("Missing Stripe-Signature header")]
    MissingHeader,

    #[error("Timestamp outside the tolerance zone")]
    StaleTimestamp,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Missing or invalid metadata field: {0}")]
    MissingMetadata(&'static str),

    #[error("Invalid webhook signing secret")]
    InvalidSecret,
}

/// Verify a delivery's signature header against the raw body.
///
/// `now` is the current unix time in seconds.
///
/// # Errors
///
/// Returns `WebhookError::MalformedHeader` if the header has no timestamp or
/// no `v1` signature, `WebhookError::StaleTimestamp` if the timestamp is more
/// than [`SIGNATURE_TOLERANCE_SECS`] away from `now`, and
/// `WebhookError::SignatureMismatch` if no `v1` signature matches.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::MalformedHeader)?;

    let fresh = now
        .checked_sub(ts)
        .map(i64::unsigned_abs)
        .is_some_and(|age| age <= SIGNATURE_TOLERANCE_SECS.unsigned_abs());
    if !fresh {
        return Err(WebhookError::StaleTimestamp);
    }

    let expected = sign(secret, timestamp, payload)?;
    if signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Compute the hex `v1` signature for a timestamp and payload.
///
/// # Errors
///
/// Returns `WebhookError::InvalidSecret` if the secret cannot key the HMAC.
pub fn sign(secret: &str, timestamp: &str, payload: &[u8]) -> Result<String, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

/// The object an event is about.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl Event {
    /// Parse an event from the raw request body.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidPayload` if the body is not an event.
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }
}

/// What the server should do in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    /// Mark the order paid and completed and empty the buyer's cart.
    MarkPaid { order_id: OrderId, user_id: UserId },
    /// Find the checkout session for this payment intent and delete its order.
    DiscardFailedPayment { payment_intent: String },
    /// Event type the server does not handle.
    Ignore { event_type: String },
}

impl WebhookAction {
    /// Decide the action for an event.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::MissingMetadata` if a completed checkout lacks
    /// usable `orderId`/`userId` metadata, and `WebhookError::InvalidPayload`
    /// if a failed payment has no intent id.
    pub fn from_event(event: &Event) -> Result<Self, WebhookError> {
        match event.event_type.as_str() {
            CHECKOUT_COMPLETED => {
                let metadata = &event.data.object["metadata"];
                let order_id = metadata_id(metadata, METADATA_ORDER_ID)?;
                let user_id = metadata_id(metadata, METADATA_USER_ID)?;
                Ok(Self::MarkPaid { order_id, user_id })
            }
            PAYMENT_FAILED => {
                let payment_intent = event.data.object["id"]
                    .as_str()
                    .ok_or_else(|| {
                        WebhookError::InvalidPayload("payment intent has no id".to_string())
                    })?
                    .to_string();
                Ok(Self::DiscardFailedPayment { payment_intent })
            }
            other => Ok(Self::Ignore {
                event_type: other.to_string(),
            }),
        }
    }
}

fn metadata_id<T: std::str::FromStr>(
    metadata: &serde_json::Value,
    key: &'static str,
) -> Result<T, WebhookError> {
    metadata[key]
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .ok_or(WebhookError::MissingMetadata(key))
}
