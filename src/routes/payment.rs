//! `/api/payment` routes.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::ApiJson;
use crate::domain::events::{DomainEvent, PaymentEvent};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::services::payment::{construct_webhook_event, to_minor_units, PaymentError};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-intent", post(create_intent))
        .route("/verify", post(verify))
        .route("/webhook", post(webhook))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateIntent {
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentCreated {
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPayment {
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub success: bool,
    pub message: String,
}

async fn create_intent(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<CreateIntent>,
) -> Result<Json<IntentCreated>> {
    let amount_minor = to_minor_units(body.amount)?;
    let currency = &state.config().stripe.currency;
    let intent = state.payments().create_intent(amount_minor, currency).await?;
    info!(user_id = %user.id, intent_id = %intent.id, amount_minor, "payment intent created");
    Ok(Json(IntentCreated { client_secret: intent.client_secret }))
}

async fn verify(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<VerifyPayment>,
) -> Result<(StatusCode, Json<VerifyOutcome>)> {
    let intent = state.payments().retrieve_intent(&body.payment_intent_id).await?;
    if intent.is_succeeded() {
        Ok((
            StatusCode::OK,
            Json(VerifyOutcome { success: true, message: "Payment verified successfully".to_string() }),
        ))
    } else {
        info!(user_id = %user.id, intent_id = %intent.id, status = %intent.status, "payment not yet successful");
        Ok((
            StatusCode::BAD_REQUEST,
            Json(VerifyOutcome { success: false, message: "Payment not successful".to_string() }),
        ))
    }
}

/// Signed provider callback. Records the outcome on the event bus only;
/// orders are marked paid through `PUT /api/orders/:id/pay`.
async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<Value>> {
    let secret = state
        .config()
        .stripe
        .webhook_secret
        .as_ref()
        .ok_or_else(|| PaymentError::InvalidSignature("Webhook secret is not configured".to_string()))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PaymentError::InvalidSignature("Missing Stripe-Signature header".to_string()))?;

    let now = chrono::Utc::now().timestamp();
    let event = construct_webhook_event(&body, signature, secret.expose_secret(), now).map_err(|e| {
        warn!(error = %e, "webhook rejected");
        e
    })?;

    let intent_id = event.payment_intent_id().unwrap_or_default().to_string();
    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            info!(event_id = %event.id, intent_id = %intent_id, "payment succeeded");
            state
                .events()
                .publish(&DomainEvent::Payment(PaymentEvent::IntentSucceeded { payment_intent_id: intent_id }))
                .await;
        }
        "payment_intent.payment_failed" => {
            warn!(event_id = %event.id, intent_id = %intent_id, "payment failed");
            state
                .events()
                .publish(&DomainEvent::Payment(PaymentEvent::IntentFailed { payment_intent_id: intent_id }))
                .await;
        }
        other => info!(event_id = %event.id, event_type = other, "unhandled webhook event"),
    }

    Ok(Json(json!({ "received": true })))
}
