//! # Routes
//!
//! Axum router configuration for the shop API.
//! Paths keep the trailing slash the storefront already calls.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes under `/api/v1`:
/// - Carts:
///   - POST /carts/ - Get or create the caller's cart
///   - GET  /carts/mine/ - The caller's cart
///   - GET, DELETE /carts/{cart_id}/
///   - GET, POST /carts/{cart_id}/items/
///   - GET, PATCH, DELETE /carts/{cart_id}/items/{item_id}/
///
/// - Orders:
///   - GET, POST /orders/
///   - GET, DELETE /orders/{order_id}/
///   - POST  /orders/{order_id}/cancel/
///   - PATCH /orders/{order_id}/update_status/ - Staff only
///
/// - Payments:
///   - POST /payment/initiate/ - Returns the gateway URL
///   - POST /payment/success/, /payment/fail/, /payment/cancel/ - Gateway callbacks
///
/// - Products:
///   - GET /products/, /products/{product_id}/
///   - GET /products/{product_id}/has-ordered/
pub fn create_router(state: AppState) -> Router {
    // The storefront runs on its own origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Full paths: nesting "/" under a prefix would drop the trailing slash.
    let cart_routes = Router::new()
        .route("/carts/", post(handlers::create_cart))
        .route("/carts/mine/", get(handlers::my_cart))
        .route(
            "/carts/{cart_id}/",
            get(handlers::get_cart).delete(handlers::delete_cart),
        )
        .route(
            "/carts/{cart_id}/items/",
            get(handlers::list_cart_items).post(handlers::add_cart_item),
        )
        .route(
            "/carts/{cart_id}/items/{item_id}/",
            get(handlers::get_cart_item)
                .patch(handlers::update_cart_item)
                .delete(handlers::remove_cart_item),
        );

    let order_routes = Router::new()
        .route(
            "/orders/",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route(
            "/orders/{order_id}/",
            get(handlers::get_order).delete(handlers::delete_order),
        )
        .route("/orders/{order_id}/cancel/", post(handlers::cancel_order))
        .route(
            "/orders/{order_id}/update_status/",
            patch(handlers::update_order_status),
        );

    let payment_routes = Router::new()
        .route("/payment/initiate/", post(handlers::initiate_payment))
        .route("/payment/success/", post(handlers::payment_success))
        .route("/payment/fail/", post(handlers::payment_fail))
        .route("/payment/cancel/", post(handlers::payment_cancel));

    let product_routes = Router::new()
        .route("/products/", get(handlers::list_products))
        .route("/products/{product_id}/", get(handlers::get_product))
        .route(
            "/products/{product_id}/has-ordered/",
            get(handlers::has_ordered),
        );

    let api_routes = Router::new()
        .merge(cart_routes)
        .merge(order_routes)
        .merge(payment_routes)
        .merge(product_routes);

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
