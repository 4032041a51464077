use super::json_body;
use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_core::{Cart, CartId, CartItem, CartItemId, Operation, Price, UserId};
use tracing::instrument;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Add item request
#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Change quantity request
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: u32,
}

/// Cart line with catalog details. Name and prices are absent when the
/// product has since left the catalog.
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: CartItemId,
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Price>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItemResponse>,
    pub total_price: Price,
    pub created_at: DateTime<Utc>,
}

impl AppState {
    fn cart_item_response(&self, item: CartItem) -> CartItemResponse {
        let product = self.catalog.get(&item.product_id);
        CartItemResponse {
            id: item.id,
            product_name: product.map(|p| p.name.clone()),
            unit_price: product.map(|p| p.price),
            total_price: product.and_then(|p| p.price.times(item.quantity)),
            product_id: item.product_id,
            quantity: item.quantity,
        }
    }

    fn cart_response(&self, cart: Cart) -> CartResponse {
        let total_price = cart.total(&self.catalog, self.config.currency);
        CartResponse {
            id: cart.id,
            user_id: cart.user_id,
            created_at: cart.created_at,
            total_price,
            items: cart
                .items
                .into_iter()
                .map(|item| self.cart_item_response(item))
                .collect(),
        }
    }
}

// =============================================================================
// Carts
// =============================================================================

/// Create the caller's cart, or return the one they already have
#[instrument(skip(state, caller))]
pub async fn create_cart(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<(StatusCode, Json<CartResponse>)> {
    let user = state.authorize_user(Operation::CartCreate, &caller)?;
    let (cart, created) = state.carts.create(user).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(state.cart_response(cart))))
}

pub async fn my_cart(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<CartResponse>> {
    let user = state.authorize_user(Operation::CartMine, &caller)?;
    let cart = state.carts.mine(user).await?;
    Ok(Json(state.cart_response(cart)))
}

pub async fn get_cart(
    State(state): State<AppState>,
    caller: Caller,
    Path(cart_id): Path<CartId>,
) -> ApiResult<Json<CartResponse>> {
    let user = state.authorize_user(Operation::CartRetrieve, &caller)?;
    let cart = state.carts.get(user, cart_id).await?;
    Ok(Json(state.cart_response(cart)))
}

#[instrument(skip(state, caller))]
pub async fn delete_cart(
    State(state): State<AppState>,
    caller: Caller,
    Path(cart_id): Path<CartId>,
) -> ApiResult<StatusCode> {
    let user = state.authorize_user(Operation::CartDestroy, &caller)?;
    state.carts.delete(user, cart_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Cart Items
// =============================================================================

pub async fn list_cart_items(
    State(state): State<AppState>,
    caller: Caller,
    Path(cart_id): Path<CartId>,
) -> ApiResult<Json<Vec<CartItemResponse>>> {
    let user = state.authorize_user(Operation::CartItemList, &caller)?;
    let items = state.carts.list_items(user, cart_id).await?;
    Ok(Json(
        items
            .into_iter()
            .map(|item| state.cart_item_response(item))
            .collect(),
    ))
}

#[instrument(skip(state, caller, body))]
pub async fn add_cart_item(
    State(state): State<AppState>,
    caller: Caller,
    Path(cart_id): Path<CartId>,
    body: Result<Json<AddCartItemRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CartItemResponse>)> {
    let user = state.authorize_user(Operation::CartItemAdd, &caller)?;
    let request = json_body(body)?;
    let item = state
        .carts
        .add_item(user, cart_id, &request.product_id, request.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(state.cart_item_response(item))))
}

pub async fn get_cart_item(
    State(state): State<AppState>,
    caller: Caller,
    Path((cart_id, item_id)): Path<(CartId, CartItemId)>,
) -> ApiResult<Json<CartItemResponse>> {
    let user = state.authorize_user(Operation::CartItemRetrieve, &caller)?;
    let item = state.carts.get_item(user, cart_id, item_id).await?;
    Ok(Json(state.cart_item_response(item)))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    caller: Caller,
    Path((cart_id, item_id)): Path<(CartId, CartItemId)>,
    body: Result<Json<UpdateCartItemRequest>, JsonRejection>,
) -> ApiResult<Json<CartItemResponse>> {
    let user = state.authorize_user(Operation::CartItemUpdate, &caller)?;
    let request = json_body(body)?;
    let item = state
        .carts
        .update_item(user, cart_id, item_id, request.quantity)
        .await?;
    Ok(Json(state.cart_item_response(item)))
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    caller: Caller,
    Path((cart_id, item_id)): Path<(CartId, CartItemId)>,
) -> ApiResult<StatusCode> {
    let user = state.authorize_user(Operation::CartItemRemove, &caller)?;
    state.carts.remove_item(user, cart_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
