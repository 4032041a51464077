//! # Commerce Store
//!
//! Persistence seam for carts and orders. Services only talk to the
//! [`CommerceStore`] trait, so a SQL-backed implementation can replace
//! [`InMemoryStore`](crate::memory::InMemoryStore) without touching them.
//!
//! Implementations must keep two invariants atomic:
//! - at most one cart per user (`get_or_create_cart`)
//! - at most one item per `(cart, product)` pair (`add_cart_item`)

use crate::cart::{Cart, CartId, CartItem, CartItemId};
use crate::error::CommerceResult;
use crate::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::user::UserId;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Return the user's cart, creating an empty one if needed.
    /// The flag is `true` when the cart was created by this call.
    async fn get_or_create_cart(&self, user_id: UserId) -> CommerceResult<(Cart, bool)>;

    async fn cart_for_user(&self, user_id: UserId) -> CommerceResult<Option<Cart>>;

    async fn get_cart(&self, cart_id: CartId) -> CommerceResult<Option<Cart>>;

    /// Returns `false` if there was no such cart.
    async fn delete_cart(&self, cart_id: CartId) -> CommerceResult<bool>;

    /// Add `quantity` of a product, merging into an existing line for it.
    /// `None` if the cart does not exist.
    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Option<CartItem>>;

    async fn set_cart_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> CommerceResult<Option<CartItem>>;

    async fn delete_cart_item(&self, cart_id: CartId, item_id: CartItemId) -> CommerceResult<bool>;

    /// Persist a new order, assigning order and item ids.
    async fn insert_order(&self, order: NewOrder) -> CommerceResult<Order>;

    async fn get_order(&self, order_id: OrderId) -> CommerceResult<Option<Order>>;

    /// All orders, or only those of `owner`. Sorted by id.
    async fn list_orders(&self, owner: Option<UserId>) -> CommerceResult<Vec<Order>>;

    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> CommerceResult<Option<Order>>;

    /// Move an order to `next` only if its status is still `expected`.
    /// Returns the order as stored after the call, changed or not.
    async fn transition_order_status(
        &self,
        order_id: OrderId,
        expected: &OrderStatus,
        next: OrderStatus,
    ) -> CommerceResult<Option<Order>>;

    async fn delete_order(&self, order_id: OrderId) -> CommerceResult<bool>;

    /// Whether any order of the user, in any status, contains the product.
    async fn has_ordered_product(&self, user_id: UserId, product_id: &str) -> CommerceResult<bool>;
}

/// Shared store handle
pub type SharedStore = Arc<dyn CommerceStore>;
