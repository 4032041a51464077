//! # shop-sslcommerz
//!
//! SSLCommerz hosted checkout for shopfront.
//!
//! [`SslCommerzGateway`] implements `shop_core::PaymentGateway` on top of the
//! SSLCommerz v4 session API. It posts the session form and hands back the
//! `GatewayPageURL` the shopper must be redirected to.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_sslcommerz::SslCommerzGateway;
//! use shop_core::PaymentGateway;
//!
//! // Reads SSLCOMMERZ_STORE_ID, SSLCOMMERZ_STORE_PASSWORD, SSLCOMMERZ_SANDBOX
//! let gateway = SslCommerzGateway::from_env()?;
//!
//! let session = gateway.create_session(&request).await?;
//! // Redirect the shopper to session.gateway_url
//! ```

pub mod config;
pub mod session;

// Re-exports
pub use config::SslCommerzConfig;
pub use session::SslCommerzGateway;
