//! `/api/users` routes and `/api/auth/me`.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::domain::aggregates::{ProfileUpdate, ShippingAddress, User};
use crate::error::Result;
use crate::middleware::{AuthUser, RequireAdmin};
use crate::services::users;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(all))
        .route("/profile", get(profile).put(update_profile))
        .route("/address", post(add_address))
        .route("/wishlist/:product_id", post(add_to_wishlist).delete(remove_from_wishlist))
}

/// The signed-in user.
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

async fn all(State(state): State<AppState>, RequireAdmin(_admin): RequireAdmin) -> Result<Json<Vec<User>>> {
    Ok(Json(users::list_users(state.store()).await?))
}

async fn profile(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<User>> {
    Ok(Json(users::update_profile(state.store(), user.id, update).await?))
}

async fn add_address(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(address): ApiJson<ShippingAddress>,
) -> Result<(StatusCode, Json<Vec<ShippingAddress>>)> {
    let addresses = users::add_address(state.store(), user.id, address).await?;
    Ok((StatusCode::CREATED, Json(addresses)))
}

async fn add_to_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Uuid>>> {
    Ok(Json(users::add_to_wishlist(state.store(), user.id, product_id).await?))
}

async fn remove_from_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Uuid>>> {
    Ok(Json(users::remove_from_wishlist(state.store(), user.id, product_id).await?))
}
