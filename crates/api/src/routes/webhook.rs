//! Payment gateway webhook.
//!
//! Deliveries are verified against the raw body before anything is parsed.
//! Once a delivery is authentic it is always acknowledged; failures applying
//! it are logged rather than returned, so the gateway does not retry events
//! the server has already decided about.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{debug, error, info, instrument, warn};

use greenbasket_core::{OrderId, UserId};

use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::services::payments::METADATA_ORDER_ID;
use crate::services::webhook::{Event, WebhookAction, WebhookError, verify_signature};
use crate::state::AppState;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// `POST /stripe`
#[instrument(skip_all, fields(event_id, event_type))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader)?;

    verify_signature(
        state.config().stripe.webhook_secret.expose_secret(),
        signature,
        &body,
        Utc::now().timestamp(),
    )
    .inspect_err(|e| warn!(error = %e, "Rejected webhook delivery"))?;

    let event = Event::parse(&body)?;
    let span = tracing::Span::current();
    span.record("event_id", event.id.as_str());
    span.record("event_type", event.event_type.as_str());

    match WebhookAction::from_event(&event) {
        Ok(action) => apply(&state, action).await,
        Err(e) => warn!(error = %e, "Webhook event could not be interpreted"),
    }

    Ok(Json(json!({ "received": true })))
}

async fn apply(state: &AppState, action: WebhookAction) {
    match action {
        WebhookAction::MarkPaid { order_id, user_id } => mark_paid(state, order_id, user_id).await,
        WebhookAction::DiscardFailedPayment { payment_intent } => {
            discard_failed_payment(state, &payment_intent).await;
        }
        WebhookAction::Ignore { event_type } => {
            debug!(%event_type, "Unhandled webhook event");
        }
    }
}

async fn mark_paid(state: &AppState, order_id: OrderId, user_id: UserId) {
    match OrderRepository::new(state.pool())
        .mark_paid(order_id, user_id)
        .await
    {
        Ok(()) => info!(%order_id, %user_id, "Order paid"),
        Err(RepositoryError::NotFound) => {
            warn!(%order_id, %user_id, "Paid checkout refers to an unknown order");
        }
        Err(e) => report(&AppError::from(e), "Failed to mark order paid"),
    }
}

async fn discard_failed_payment(state: &AppState, payment_intent: &str) {
    let sessions = match state.stripe().sessions_for_payment_intent(payment_intent).await {
        Ok(sessions) => sessions,
        Err(e) => {
            report(&AppError::from(e), "Failed to look up checkout session");
            return;
        }
    };

    let Some(order_id) = sessions
        .first()
        .and_then(|s| s.metadata.get(METADATA_ORDER_ID))
        .and_then(|raw| raw.parse::<OrderId>().ok())
    else {
        warn!(%payment_intent, "No order found for failed payment");
        return;
    };

    match OrderRepository::new(state.pool()).delete(order_id).await {
        Ok(true) => info!(%order_id, %payment_intent, "Deleted order after failed payment"),
        Ok(false) => debug!(%order_id, "Order for failed payment already gone"),
        Err(e) => report(&AppError::from(e), "Failed to delete unpaid order"),
    }
}

/// Log and capture a failure the gateway will not see.
fn report(err: &AppError, context: &str) {
    let event_id = sentry::capture_error(err);
    error!(error = %err, sentry_event_id = %event_id, "{context}");
}
