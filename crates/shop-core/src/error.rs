//! # Commerce Error Types
//!
//! Typed error handling for the shopfront cart, order and payment services.
//! All service operations return `Result<T, CommerceError>`.

use thiserror::Error;

/// Core error type for all cart, order and payment operations
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller did not present valid credentials
    #[error("Authentication required")]
    Unauthenticated,

    /// Caller is authenticated but not allowed to do this
    #[error("{0}")]
    PermissionDenied(String),

    /// The caller has no cart (or cannot see the requested one)
    #[error("Cart not found")]
    CartNotFound,

    /// Cart item not found in the caller's cart
    #[error("Cart item not found: {item_id}")]
    CartItemNotFound { item_id: u64 },

    /// Order not found or not visible to the caller
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: u64 },

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Product exists but cannot be purchased
    #[error("Product is not available: {product_id}")]
    ProductUnavailable { product_id: String },

    /// Requested status change is not allowed from the current status
    #[error("Order {order_id} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        order_id: u64,
        from: String,
        to: String,
    },

    /// Gateway transaction id does not follow `txn_<order id>`
    #[error("Malformed transaction id: {0}")]
    MalformedTransactionId(String),

    /// Callback signature missing or wrong
    #[error("Callback verification failed: {0}")]
    CallbackVerificationFailed(String),

    /// Payment session could not be created
    #[error("Payment initiation failed")]
    PaymentInitiationFailed,

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CommerceError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommerceError::NetworkError(_) | CommerceError::ProviderError { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CommerceError::Configuration(_) => 500,
            CommerceError::InvalidRequest(_) => 400,
            CommerceError::Unauthenticated => 401,
            CommerceError::PermissionDenied(_) => 403,
            CommerceError::CartNotFound => 404,
            CommerceError::CartItemNotFound { .. } => 404,
            CommerceError::OrderNotFound { .. } => 404,
            CommerceError::ProductNotFound { .. } => 404,
            CommerceError::ProductUnavailable { .. } => 400,
            CommerceError::InvalidTransition { .. } => 400,
            CommerceError::MalformedTransactionId(_) => 400,
            CommerceError::CallbackVerificationFailed(_) => 401,
            CommerceError::PaymentInitiationFailed => 400,
            CommerceError::ProviderError { .. } => 502,
            CommerceError::NetworkError(_) => 503,
            CommerceError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for commerce operations
pub type CommerceResult<T> = Result<T, CommerceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(CommerceError::NetworkError("timeout".into()).is_retryable());
        assert!(CommerceError::ProviderError {
            provider: "sslcommerz".into(),
            message: "busy".into()
        }
        .is_retryable());
        assert!(!CommerceError::InvalidRequest("bad data".into()).is_retryable());
        assert!(!CommerceError::PaymentInitiationFailed.is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CommerceError::Unauthenticated.status_code(), 401);
        assert_eq!(
            CommerceError::PermissionDenied("Not your cart.".into()).status_code(),
            403
        );
        assert_eq!(CommerceError::CartNotFound.status_code(), 404);
        assert_eq!(CommerceError::PaymentInitiationFailed.status_code(), 400);
        assert_eq!(
            CommerceError::MalformedTransactionId("txn42".into()).status_code(),
            400
        );
        assert_eq!(
            CommerceError::Configuration("PORT".into()).status_code(),
            500
        );
        assert_eq!(CommerceError::Serialization("eof".into()).status_code(), 500);
    }

    #[test]
    fn test_messages() {
        assert_eq!(CommerceError::CartNotFound.to_string(), "Cart not found");
        assert_eq!(
            CommerceError::PermissionDenied("Not your cart.".into()).to_string(),
            "Not your cart."
        );
        assert_eq!(
            CommerceError::PaymentInitiationFailed.to_string(),
            "Payment initiation failed"
        );
    }
}
