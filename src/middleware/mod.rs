//! Request extractors for authentication and role gating.

pub mod auth;

pub use auth::{AuthUser, RequireAdmin};
