//! ShopHub storefront
//!
//! REST API and typed client for a small e-commerce storefront.
//!
//! ## Features
//! - Product catalog with filters, search, paging and reviews
//! - Per-user cart with merge-on-add and live pricing
//! - Checkout with coupon discounts and stock decrement
//! - Payment intents and signed webhooks through Stripe
//! - Role-gated admin mutations
//! - PostgreSQL or in-memory storage behind one `Store` trait

pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use routes::router;
pub use state::AppState;
