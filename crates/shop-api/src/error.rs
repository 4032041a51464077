//! # API Errors
//!
//! Maps `CommerceError` onto HTTP responses with a JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shop_core::CommerceError;
use thiserror::Error;
use tracing::error;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Handler error: a `CommerceError` on its way to the client
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub CommerceError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_server_error() {
            error!("Request failed: {}", self.0);
            // Internal details stay in the log.
            let mut body = ErrorResponse::new("Internal server error", status.as_u16());
            if self.0.is_retryable() {
                body = body.with_details("The payment provider is unavailable, retry later");
            }
            body
        } else {
            ErrorResponse::new(self.0.to_string(), status.as_u16())
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(CommerceError::Unauthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError(CommerceError::PaymentInitiationFailed).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(CommerceError::OrderNotFound { order_id: 9 }).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_client_errors_keep_message() {
        let response = ApiError(CommerceError::PermissionDenied("Not your cart.".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_error_response_skips_empty_details() {
        let json = serde_json::to_value(ErrorResponse::new("Cart not found", 404)).unwrap();
        assert_eq!(json["error"], "Cart not found");
        assert_eq!(json["code"], 404);
        assert!(json.get("details").is_none());
    }
}
