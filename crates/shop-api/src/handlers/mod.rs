//! # Request Handlers
//!
//! Axum request handlers for carts, orders, payments and products.
//! Every handler checks the access policy for its operation before calling
//! into the services. JSON bodies are only inspected once the caller passed
//! that check.

pub mod carts;
pub mod orders;
pub mod payments;
pub mod products;

use crate::error::ApiResult;
use axum::{extract::rejection::JsonRejection, response::IntoResponse, Json};
use serde::Serialize;
use shop_core::CommerceError;

pub use carts::*;
pub use orders::*;
pub use payments::*;
pub use products::*;

/// Plain `{"status": "..."}` acknowledgement
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: String,
}

impl StatusMessage {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// Unpack a JSON body taken as `Result` so that the policy check runs first.
/// Any rejection becomes a 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(CommerceError::InvalidRequest(rejection.body_text()).into()),
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "shopfront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
