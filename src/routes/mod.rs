//! HTTP routes.
//!
//! | Prefix           | Module       |
//! |------------------|--------------|
//! | `/api/products`  | [`products`] |
//! | `/api/cart`      | [`cart`]     |
//! | `/api/orders`    | [`orders`]   |
//! | `/api/payment`   | [`payment`]  |
//! | `/api/users`     | [`users`]    |
//! | `/api/auth/me`   | [`users::me`] |

pub mod cart;
pub mod orders;
pub mod payment;
pub mod products;
pub mod users;

use axum::{
    extract::{FromRequest, FromRequestParts, State},
    http::{header, HeaderValue, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::state::AppState;

/// `Json` extractor whose rejections render as `{message}` bodies.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Path` extractor whose rejections render as `{message}` bodies.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// `Query` extractor whose rejections render as `{message}` bodies.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().client_url);

    Router::new()
        .route("/", get(banner))
        .route("/api/health", get(health))
        .route("/health/ready", get(ready))
        .nest("/api/products", products::router())
        .nest("/api/cart", cart::router())
        .nest("/api/orders", orders::router())
        .nest("/api/payment", payment::router())
        .nest("/api/users", users::router())
        .route("/api/auth/me", get(users::me))
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

fn cors_layer(client_url: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);
    match HeaderValue::from_str(client_url.trim_end_matches('/')) {
        Ok(origin) => base.allow_origin(origin),
        Err(e) => {
            tracing::warn!(client_url, error = %e, "invalid CLIENT_URL, cross-origin requests disabled");
            base
        }
    }
}

async fn banner() -> Json<Value> {
    Json(json!({
        "message": "ShopHub E-Commerce API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/api/health",
            "products": "/api/products",
            "cart": "/api/cart",
            "orders": "/api/orders",
            "payment": "/api/payment",
            "users": "/api/users",
        },
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "message": "API is running..." }))
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::error!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
        }
    }
}

async fn not_found(uri: axum::http::Uri) -> AppError {
    AppError::NotFound(format!("Not Found - {uri}"))
}
