//! `/api/orders` routes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::db::OrderWithCustomer;
use crate::domain::aggregates::{Order, OrderDraft};
use crate::error::Result;
use crate::middleware::{AuthUser, RequireAdmin};
use crate::services::orders::{self, CouponRequest, PaymentUpdate, StatusUpdate};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(all))
        .route("/validate-coupon", post(validate_coupon))
        .route("/myorders", get(mine))
        .route("/:id", get(by_id))
        .route("/:id/pay", put(pay))
        .route("/:id/status", put(set_status))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(draft): ApiJson<OrderDraft>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = orders::place_order(state.store(), state.events(), user.id, draft).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn all(State(state): State<AppState>, RequireAdmin(_admin): RequireAdmin) -> Result<Json<Vec<OrderWithCustomer>>> {
    Ok(Json(orders::all_orders(state.store()).await?))
}

async fn mine(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(orders::my_orders(state.store(), user.id).await?))
}

async fn by_id(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OrderWithCustomer>> {
    Ok(Json(orders::get_order(state.store(), &user, id).await?))
}

async fn pay(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<PaymentUpdate>,
) -> Result<Json<Order>> {
    Ok(Json(orders::pay_order(state.store(), state.events(), &user, id, update).await?))
}

async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> Result<Json<Order>> {
    Ok(Json(orders::update_status(state.store(), state.events(), id, body.status).await?))
}

async fn validate_coupon(ApiJson(req): ApiJson<CouponRequest>) -> Response {
    match orders::validate_coupon(&req) {
        Ok(check) => Json(check).into_response(),
        Err(check) => (StatusCode::BAD_REQUEST, Json(check)).into_response(),
    }
}
