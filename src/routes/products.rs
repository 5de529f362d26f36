//! `/api/products` routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{ApiJson, ApiPath, ApiQuery};
use crate::domain::aggregates::{NewProduct, NewReview, Product, ProductFilter, ProductPage, ProductUpdate};
use crate::error::Result;
use crate::middleware::{AuthUser, RequireAdmin};
use crate::services::{catalog, reviews};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/trending", get(trending))
        .route("/:id", get(detail).put(update).delete(remove))
        .route("/:id/reviews", post(add_review))
}

async fn list(State(state): State<AppState>, ApiQuery(filter): ApiQuery<ProductFilter>) -> Result<Json<ProductPage>> {
    Ok(Json(catalog::list_products(state.store(), &filter).await?))
}

async fn trending(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(catalog::trending_products(state.store()).await?))
}

async fn detail(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>> {
    Ok(Json(catalog::product_detail(state.store(), id).await?))
}

async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiJson(input): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = catalog::create_product(state.store(), input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> Result<Json<Product>> {
    Ok(Json(catalog::update_product(state.store(), id, update).await?))
}

async fn remove(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>> {
    catalog::delete_product(state.store(), id).await?;
    Ok(Json(json!({ "message": "Product removed" })))
}

async fn add_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<NewReview>,
) -> Result<(StatusCode, Json<Value>)> {
    input.validate()?;
    reviews::add_review(state.store(), state.events(), user.id, id, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Review added" }))))
}
