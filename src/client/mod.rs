//! Typed HTTP client for the storefront API.
//!
//! [`ShopClient`] wraps `reqwest` with the API's paths and payload types. The
//! [`state`] module holds client-side mirrors of cart, catalog and session
//! state that are refreshed through it.
//!
//! ```rust,ignore
//! let client = ShopClient::new("http://localhost:5000")?.with_token(token);
//! let mut cart = CartState::default();
//! cart.fetch(&client).await;
//! let totals = cart.summary();
//! ```

pub mod state;

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::OrderWithCustomer;
use crate::domain::aggregates::{
    NewReview, Order, OrderDraft, Product, ProductFilter, ProductPage, ProfileUpdate, ShippingAddress, User,
};
use crate::domain::value_objects::Quantity;
use crate::routes::payment::{CreateIntent, IntentCreated, VerifyOutcome, VerifyPayment};
use crate::services::cart::{AddToCart, CartLineView, CartSummary, UpdateQuantity};
use crate::services::orders::{CouponCheck, CouponRequest, PaymentUpdate};

pub use state::{AuthState, CartState, ProductState};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status and a `{message}` body.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for `{base_url}/api`.
#[derive(Clone)]
pub struct ShopClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl std::fmt::Debug for ShopClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ShopClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn set_token(&mut self, token: Option<SecretString>) {
        self.token = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}/api{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }
        Err(api_error(status, &bytes))
    }

    /// Like `send`, but a 400 whose body parses as `T` is returned as a value.
    async fn send_outcome<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }
        if status == StatusCode::BAD_REQUEST {
            if let Ok(outcome) = serde_json::from_slice(&bytes) {
                return Ok(outcome);
            }
        }
        Err(api_error(status, &bytes))
    }

    // Account

    /// The user the current token belongs to.
    pub async fn me(&self) -> Result<User, ClientError> {
        Self::send(self.request(Method::GET, "/auth/me")).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        Self::send(self.request(Method::PUT, "/users/profile").json(update)).await
    }

    pub async fn add_address(&self, address: &ShippingAddress) -> Result<Vec<ShippingAddress>, ClientError> {
        Self::send(self.request(Method::POST, "/users/address").json(address)).await
    }

    pub async fn add_to_wishlist(&self, product_id: Uuid) -> Result<Vec<Uuid>, ClientError> {
        Self::send(self.request(Method::POST, &format!("/users/wishlist/{product_id}"))).await
    }

    pub async fn remove_from_wishlist(&self, product_id: Uuid) -> Result<Vec<Uuid>, ClientError> {
        Self::send(self.request(Method::DELETE, &format!("/users/wishlist/{product_id}"))).await
    }

    /// Admin only.
    pub async fn users(&self) -> Result<Vec<User>, ClientError> {
        Self::send(self.request(Method::GET, "/users")).await
    }

    // Catalog

    pub async fn products(&self, filter: &ProductFilter) -> Result<ProductPage, ClientError> {
        Self::send(self.request(Method::GET, "/products").query(filter)).await
    }

    pub async fn trending_products(&self) -> Result<Vec<Product>, ClientError> {
        Self::send(self.request(Method::GET, "/products/trending")).await
    }

    /// Product with its reviews populated.
    pub async fn product(&self, id: Uuid) -> Result<serde_json::Value, ClientError> {
        Self::send(self.request(Method::GET, &format!("/products/{id}"))).await
    }

    pub async fn add_review(&self, product_id: Uuid, review: &NewReview) -> Result<(), ClientError> {
        let request = self.request(Method::POST, &format!("/products/{product_id}/reviews")).json(review);
        Self::send::<IgnoredAny>(request).await.map(|_| ())
    }

    // Cart

    pub async fn cart(&self) -> Result<Vec<CartLineView>, ClientError> {
        Self::send(self.request(Method::GET, "/cart")).await
    }

    pub async fn add_to_cart(&self, item: &AddToCart) -> Result<Vec<CartLineView>, ClientError> {
        Self::send(self.request(Method::POST, "/cart").json(item)).await
    }

    pub async fn update_cart_item(&self, item_id: Uuid, quantity: Quantity) -> Result<Vec<CartLineView>, ClientError> {
        let request = self
            .request(Method::PUT, &format!("/cart/{item_id}"))
            .json(&UpdateQuantity { quantity });
        Self::send(request).await
    }

    pub async fn remove_from_cart(&self, item_id: Uuid) -> Result<Vec<CartLineView>, ClientError> {
        Self::send(self.request(Method::DELETE, &format!("/cart/{item_id}"))).await
    }

    pub async fn clear_cart(&self) -> Result<(), ClientError> {
        Self::send::<IgnoredAny>(self.request(Method::DELETE, "/cart")).await.map(|_| ())
    }

    pub async fn cart_summary(&self, coupon: Option<&str>) -> Result<CartSummary, ClientError> {
        let mut request = self.request(Method::GET, "/cart/summary");
        if let Some(code) = coupon {
            request = request.query(&[("coupon", code)]);
        }
        Self::send(request).await
    }

    // Orders

    pub async fn validate_coupon(&self, code: &str, items_price: Decimal) -> Result<CouponCheck, ClientError> {
        let body = CouponRequest { code: code.to_string(), items_price };
        Self::send_outcome(self.request(Method::POST, "/orders/validate-coupon").json(&body)).await
    }

    pub async fn place_order(&self, draft: &OrderDraft) -> Result<Order, ClientError> {
        Self::send(self.request(Method::POST, "/orders").json(draft)).await
    }

    pub async fn my_orders(&self) -> Result<Vec<Order>, ClientError> {
        Self::send(self.request(Method::GET, "/orders/myorders")).await
    }

    pub async fn order(&self, id: Uuid) -> Result<OrderWithCustomer, ClientError> {
        Self::send(self.request(Method::GET, &format!("/orders/{id}"))).await
    }

    pub async fn pay_order(&self, id: Uuid, update: &PaymentUpdate) -> Result<Order, ClientError> {
        Self::send(self.request(Method::PUT, &format!("/orders/{id}/pay")).json(update)).await
    }

    // Payment

    /// Returns the intent's client secret.
    pub async fn create_payment_intent(&self, amount: Decimal) -> Result<Option<String>, ClientError> {
        let request = self.request(Method::POST, "/payment/create-intent").json(&CreateIntent { amount });
        Self::send::<IntentCreated>(request).await.map(|r| r.client_secret)
    }

    pub async fn verify_payment(&self, payment_intent_id: &str) -> Result<VerifyOutcome, ClientError> {
        let body = VerifyPayment { payment_intent_id: payment_intent_id.to_string() };
        Self::send_outcome(self.request(Method::POST, "/payment/verify").json(&body)).await
    }
}

fn api_error(status: StatusCode, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Request failed").to_string());
    ClientError::Api { status: status.as_u16(), message }
}
