//! `/api/cart` routes. Every route requires a signed-in user.

use axum::{extract::State, routing::{get, put}, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ApiJson, ApiPath, ApiQuery};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::services::cart::{self, AddToCart, CartLineView, CartSummary, UpdateQuantity};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add).delete(clear))
        .route("/summary", get(summary))
        .route("/:item_id", put(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
struct SummaryParams {
    #[serde(default)]
    coupon: Option<String>,
}

async fn get_cart(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Vec<CartLineView>>> {
    Ok(Json(cart::get_cart(state.store(), user.id).await?))
}

async fn add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(input): ApiJson<AddToCart>,
) -> Result<Json<Vec<CartLineView>>> {
    Ok(Json(cart::add_to_cart(state.store(), user.id, input).await?))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(item_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateQuantity>,
) -> Result<Json<Vec<CartLineView>>> {
    Ok(Json(cart::update_item(state.store(), user.id, item_id, body.quantity).await?))
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(item_id): ApiPath<Uuid>,
) -> Result<Json<Vec<CartLineView>>> {
    Ok(Json(cart::remove_item(state.store(), user.id, item_id).await?))
}

async fn clear(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Value>> {
    cart::clear_cart(state.store(), user.id).await?;
    Ok(Json(json!({ "message": "Cart cleared" })))
}

async fn summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<SummaryParams>,
) -> Result<Json<CartSummary>> {
    Ok(Json(cart::summary(state.store(), user.id, params.coupon.as_deref()).await?))
}
