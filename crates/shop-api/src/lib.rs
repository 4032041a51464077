//! # shop-api
//!
//! HTTP API layer for shopfront.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for carts, orders and products
//! - Payment initiation and SSLCommerz callback handlers
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/carts/` | Get or create the caller's cart |
//! | GET | `/api/v1/carts/mine/` | The caller's cart |
//! | POST | `/api/v1/carts/{cart_id}/items/` | Add a product to a cart |
//! | POST | `/api/v1/orders/` | Check out a cart |
//! | POST | `/api/v1/orders/{order_id}/cancel/` | Cancel an order |
//! | PATCH | `/api/v1/orders/{order_id}/update_status/` | Set order status (staff) |
//! | POST | `/api/v1/payment/initiate/` | Open a gateway session |
//! | POST | `/api/v1/payment/success/` | Gateway success callback |
//! | GET | `/api/v1/products/{product_id}/has-ordered/` | Purchase check |

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::Caller;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
