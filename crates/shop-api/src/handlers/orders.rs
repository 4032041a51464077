use super::{json_body, StatusMessage};
use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shop_core::{CartId, Operation, Order, OrderId};
use tracing::instrument;

/// Checkout request: which cart becomes the order
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub cart_id: CartId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn list_orders(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Order>>> {
    let user = state.authorize_user(Operation::OrderList, &caller)?;
    Ok(Json(state.orders.list(user).await?))
}

/// Check out a cart. The cart is gone afterwards.
#[instrument(skip(state, caller, body))]
pub async fn create_order(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let user = state.authorize_user(Operation::OrderCreate, &caller)?;
    let request = json_body(body)?;
    let order = state.orders.create_from_cart(user, request.cart_id).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<OrderId>,
) -> ApiResult<Json<Order>> {
    let user = state.authorize_user(Operation::OrderRetrieve, &caller)?;
    Ok(Json(state.orders.get(user, order_id).await?))
}

#[instrument(skip(state, caller))]
pub async fn delete_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<OrderId>,
) -> ApiResult<StatusCode> {
    let user = state.authorize_user(Operation::OrderDestroy, &caller)?;
    state.orders.delete(user, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, caller))]
pub async fn cancel_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<OrderId>,
) -> ApiResult<Json<StatusMessage>> {
    let user = state.authorize_user(Operation::OrderCancel, &caller)?;
    state.orders.cancel(user, order_id).await?;
    Ok(Json(StatusMessage::new("Order canceled")))
}

#[instrument(skip(state, caller, body))]
pub async fn update_order_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<OrderId>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<StatusMessage>> {
    let user = state.authorize_user(Operation::OrderUpdateStatus, &caller)?;
    let request = json_body(body)?;
    let order = state
        .orders
        .update_status(user, order_id, &request.status)
        .await?;
    Ok(Json(StatusMessage::new(format!(
        "Order status updated to {}",
        order.status
    ))))
}
