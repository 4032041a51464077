use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use shop_core::{CommerceError, Operation, Product};

#[derive(Debug, Serialize)]
pub struct HasOrderedResponse {
    #[serde(rename = "hasOrdered")]
    pub has_ordered: bool,
}

/// List active products
pub async fn list_products(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    state.authorize(Operation::ProductList, &caller)?;
    let products: Vec<_> = state.catalog.active_products().collect();
    Ok(Json(serde_json::json!({
        "products": products,
        "count": products.len()
    })))
}

/// Get single product. Withdrawn products are not found.
pub async fn get_product(
    State(state): State<AppState>,
    caller: Caller,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Product>> {
    state.authorize(Operation::ProductRetrieve, &caller)?;
    let product = state
        .catalog
        .get(&product_id)
        .filter(|p| p.active)
        .ok_or(CommerceError::ProductNotFound { product_id })?;
    Ok(Json(product.clone()))
}

/// Whether the caller ever ordered the product, in any order status.
/// Works for products that have since left the catalog.
pub async fn has_ordered(
    State(state): State<AppState>,
    caller: Caller,
    Path(product_id): Path<String>,
) -> ApiResult<Json<HasOrderedResponse>> {
    let user = state.authorize_user(Operation::ProductHasOrdered, &caller)?;
    let has_ordered = state.orders.has_ordered_product(user, &product_id).await?;
    Ok(Json(HasOrderedResponse { has_ordered }))
}
