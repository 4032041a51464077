//! # Payment Gateway Trait
//!
//! Seam between the payment bridge and a hosted checkout provider.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentGateway (trait)                   │
//! │  ├── create_session()                                       │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                 ┌──────────┴──────────┐
//!         ┌───────┴───────┐     ┌───────┴───────┐
//!         │  SslCommerz   │     │  test doubles │
//!         │   Gateway     │     │               │
//!         └───────────────┘     └───────────────┘
//! ```

use crate::callback::CallbackRoute;
use crate::error::CommerceResult;
use crate::product::Price;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Customer details forwarded to the hosted checkout page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

/// Where the gateway sends the shopper's browser afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackUrls {
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
}

impl CallbackUrls {
    /// Callback endpoints under `backend_url`, each carrying the signature
    /// `sign` returns for its own route
    pub fn under(backend_url: &str, sign: impl Fn(CallbackRoute) -> String) -> Self {
        let base = backend_url.trim_end_matches('/');
        let url = |route: CallbackRoute| {
            format!("{}/api/v1/payment/{}/?sig={}", base, route, sign(route))
        };
        Self {
            success_url: url(CallbackRoute::Success),
            fail_url: url(CallbackRoute::Fail),
            cancel_url: url(CallbackRoute::Cancel),
        }
    }
}

/// Everything a provider needs to open a checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSessionRequest {
    /// `txn_<order id>`
    pub transaction_id: String,
    pub amount: Price,
    pub num_items: u32,
    pub customer: CustomerProfile,
    pub urls: CallbackUrls,
    pub shipping_method: String,
    pub product_name: String,
    pub product_category: String,
    pub product_profile: String,
}

/// A checkout session opened by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub transaction_id: String,
    /// Provider name (e.g., "sslcommerz")
    pub provider: String,
    /// URL to redirect the shopper to
    pub gateway_url: String,
    /// Provider's session key, if it returns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

/// A hosted checkout provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session. Any non-success answer from the provider is
    /// an error.
    async fn create_session(&self, request: &PaymentSessionRequest)
        -> CommerceResult<PaymentSession>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
