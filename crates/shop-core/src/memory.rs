use crate::cart::{Cart, CartId, CartItem, CartItemId, MAX_LINE_QUANTITY};
use crate::error::{CommerceError, CommerceResult};
use crate::order::{NewOrder, Order, OrderId, OrderItem, OrderStatus};
use crate::store::CommerceStore;
use crate::user::UserId;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    carts: HashMap<CartId, Cart>,
    orders: BTreeMap<OrderId, Order>,
    last_cart_item_id: CartItemId,
    last_order_id: OrderId,
    last_order_item_id: u64,
}

/// A thread-safe in-memory store for carts and orders.
///
/// Every mutation takes the write lock for its whole read-modify-write, which
/// keeps the one-cart-per-user and one-line-per-product rules intact under
/// concurrent requests. Data is lost on restart.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommerceStore for InMemoryStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> CommerceResult<(Cart, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(cart) = tables.carts.values().find(|c| c.user_id == user_id) {
            return Ok((cart.clone(), false));
        }
        let cart = Cart {
            id: Uuid::new_v4(),
            user_id,
            items: Vec::new(),
            created_at: Utc::now(),
        };
        tables.carts.insert(cart.id, cart.clone());
        Ok((cart, true))
    }

    async fn cart_for_user(&self, user_id: UserId) -> CommerceResult<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables.carts.values().find(|c| c.user_id == user_id).cloned())
    }

    async fn get_cart(&self, cart_id: CartId) -> CommerceResult<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables.carts.get(&cart_id).cloned())
    }

    async fn delete_cart(&self, cart_id: CartId) -> CommerceResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.carts.remove(&cart_id).is_some())
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Option<CartItem>> {
        let mut tables = self.tables.write().await;
        let next_id = tables.last_cart_item_id + 1;
        let Some(cart) = tables.carts.get_mut(&cart_id) else {
            return Ok(None);
        };

        if let Some(item) = cart.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or_else(|| {
                    CommerceError::InvalidRequest(format!(
                        "Quantity must be at most {}",
                        MAX_LINE_QUANTITY
                    ))
                })?;
            return Ok(Some(item.clone()));
        }

        let item = CartItem {
            id: next_id,
            cart_id,
            product_id: product_id.to_string(),
            quantity,
        };
        cart.items.push(item.clone());
        tables.last_cart_item_id = next_id;
        Ok(Some(item))
    }

    async fn set_cart_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> CommerceResult<Option<CartItem>> {
        let mut tables = self.tables.write().await;
        let item = tables
            .carts
            .get_mut(&cart_id)
            .and_then(|cart| cart.items.iter_mut().find(|i| i.id == item_id))
            .map(|item| {
                item.quantity = quantity;
                item.clone()
            });
        Ok(item)
    }

    async fn delete_cart_item(&self, cart_id: CartId, item_id: CartItemId) -> CommerceResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(cart) = tables.carts.get_mut(&cart_id) else {
            return Ok(false);
        };
        let before = cart.items.len();
        cart.items.retain(|i| i.id != item_id);
        Ok(cart.items.len() != before)
    }

    async fn insert_order(&self, order: NewOrder) -> CommerceResult<Order> {
        let mut tables = self.tables.write().await;
        tables.last_order_id += 1;
        let order_id = tables.last_order_id;

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            tables.last_order_item_id += 1;
            items.push(OrderItem {
                id: tables.last_order_item_id,
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
            });
        }

        let now = Utc::now();
        let stored = Order {
            id: order_id,
            user_id: order.user_id,
            status: order.status,
            items,
            total_price: order.total_price,
            created_at: now,
            updated_at: now,
        };
        tables.orders.insert(order_id, stored.clone());
        Ok(stored)
    }

    async fn get_order(&self, order_id: OrderId) -> CommerceResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&order_id).cloned())
    }

    async fn list_orders(&self, owner: Option<UserId>) -> CommerceResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| owner.map_or(true, |uid| o.user_id == uid))
            .cloned()
            .collect())
    }

    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> CommerceResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        let order = tables.orders.get_mut(&order_id).map(|order| {
            order.status = status;
            order.updated_at = Utc::now();
            order.clone()
        });
        Ok(order)
    }

    async fn transition_order_status(
        &self,
        order_id: OrderId,
        expected: &OrderStatus,
        next: OrderStatus,
    ) -> CommerceResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        let order = tables.orders.get_mut(&order_id).map(|order| {
            if order.status == *expected {
                order.status = next;
                order.updated_at = Utc::now();
            }
            order.clone()
        });
        Ok(order)
    }

    async fn delete_order(&self, order_id: OrderId) -> CommerceResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.orders.remove(&order_id).is_some())
    }

    async fn has_ordered_product(&self, user_id: UserId, product_id: &str) -> CommerceResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .any(|o| o.items.iter().any(|i| i.product_id == product_id)))
    }
}
