//! Payment provider integration.
//!
//! [`PaymentGateway`] is the seam handlers call to create and look up
//! payment intents. [`StripeGateway`] talks to the Stripe REST API:
//!
//! - Create: `POST /v1/payment_intents` (form encoded, bearer secret key)
//! - Retrieve: `GET /v1/payment_intents/{id}`
//!
//! Webhook payloads are authenticated with [`verify_webhook_signature`],
//! which checks the `Stripe-Signature` header (`t=...,v1=...`) against an
//! HMAC-SHA256 of `"{t}.{body}"`.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

use crate::config::StripeConfig;

/// Maximum age of a signed webhook, in seconds.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {status} - {message}")]
    Provider { status: u16, message: String },

    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    InvalidSignature(String),
}

/// The fields of a payment intent this service reads.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an intent for `amount_minor` units of `currency` with automatic
    /// payment methods enabled.
    async fn create_intent(&self, amount_minor: i64, currency: &str) -> Result<PaymentIntent, PaymentError>;

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError>;
}

/// Convert a major-unit amount to the provider's minor units, rounding half
/// away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidRequest("amount must be positive".to_string()));
    }
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidRequest("amount is too large".to_string()))
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: Option<SecretString>,
}

impl StripeGateway {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn secret(&self) -> Result<&str, PaymentError> {
        self.secret_key
            .as_ref()
            .map(|s| s.expose_secret())
            .ok_or(PaymentError::NotConfigured("STRIPE_SECRET_KEY"))
    }

    async fn handle_response(response: reqwest::Response) -> Result<PaymentIntent, PaymentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let message = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or_else(|| status.to_string());
        Err(PaymentError::Provider { status: status.as_u16(), message })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self))]
    async fn create_intent(&self, amount_minor: i64, currency: &str) -> Result<PaymentIntent, PaymentError> {
        let amount = amount_minor.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("automatic_payment_methods[enabled]", "true"),
        ];
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(self.secret()?)
            .form(&form)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(PaymentError::InvalidRequest("malformed payment intent id".to_string()));
        }
        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{id}", self.api_base))
            .bearer_auth(self.secret()?)
            .send()
            .await?;
        Self::handle_response(response).await
    }
}

/// A verified webhook event.
#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Id of the payment intent the event refers to, if any.
    pub fn payment_intent_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(serde_json::Value::as_str)
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Check a `Stripe-Signature` header against `payload`.
///
/// `now` is the current Unix time in seconds.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the header is malformed, no
/// `v1` signature matches, or the timestamp is outside the tolerance window.
pub fn verify_webhook_signature(payload: &[u8], header: &str, secret: &str, now: i64) -> Result<(), PaymentError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        PaymentError::InvalidSignature("Unable to extract timestamp and signatures from header".to_string())
    })?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature(
            "No signatures found with expected scheme".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);

    let matched = signatures.iter().any(|sig| {
        hex::decode(sig).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if !matched {
        return Err(PaymentError::InvalidSignature(
            "No signatures found matching the expected signature for payload".to_string(),
        ));
    }

    if now - timestamp > WEBHOOK_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature("Timestamp outside the tolerance zone".to_string()));
    }
    Ok(())
}

/// Verify the signature and parse the event.
pub fn construct_webhook_event(payload: &[u8], header: &str, secret: &str, now: i64) -> Result<WebhookEvent, PaymentError> {
    verify_webhook_signature(payload, header, secret, now)?;
    serde_json::from_slice(payload).map_err(|e| PaymentError::InvalidSignature(format!("Invalid payload: {e}")))
}

/// Header value for `payload` signed at `timestamp`. Used to sign test fixtures.
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    Ok(format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes())))
}
