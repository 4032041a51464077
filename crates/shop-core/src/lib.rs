//! # shop-core
//!
//! Core types and services for the shopfront cart / order / payment module.
//!
//! This crate provides:
//! - `Cart`, `Order` and the `CartService` / `OrderService` that enforce
//!   ownership and the order lifecycle
//! - `CommerceStore`, the persistence seam, with `InMemoryStore`
//! - `PaymentGateway`, the hosted checkout seam, and `PaymentBridge`
//! - `AccessPolicy`, the operation x role table checked before handlers run
//! - `CallbackSigner` for authenticating gateway callbacks
//! - `CommerceError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CartService, OrderService, InMemoryStore, Currency};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let carts = CartService::new(store.clone(), catalog.clone());
//! let orders = OrderService::new(store, catalog, Currency::BDT);
//!
//! let (cart, _created) = carts.create(&user).await?;
//! carts.add_item(&user, cart.id, "cotton-kurta", 2).await?;
//! let order = orders.create_from_cart(&user, cart.id).await?;
//!
//! // Hand the order to the payment bridge and redirect to session.gateway_url
//! let session = bridge.initiate(&user, InitiatePayment { order_id: Some(order.id), ..Default::default() }).await?;
//! ```

pub mod callback;
pub mod cart;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod order;
pub mod payment;
pub mod policy;
pub mod product;
pub mod store;
pub mod user;

// Re-exports for convenience
pub use callback::{CallbackRoute, CallbackSigner, TransactionId};
pub use cart::{Cart, CartId, CartItem, CartItemId, CartService, MAX_LINE_QUANTITY};
pub use error::{CommerceError, CommerceResult};
pub use gateway::{
    BoxedPaymentGateway, CallbackUrls, CustomerProfile, PaymentGateway, PaymentSession,
    PaymentSessionRequest,
};
pub use memory::InMemoryStore;
pub use order::{NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderService, OrderStatus};
pub use payment::{
    CallbackOutcome, CheckoutDefaults, GatewayCallback, InitiatePayment, PaymentBridge,
};
pub use policy::{AccessPolicy, Operation};
pub use product::{Currency, Price, Product, ProductCatalog};
pub use store::{CommerceStore, SharedStore};
pub use user::{Role, User, UserDirectory, UserId};
