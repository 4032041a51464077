//! # Orders
//!
//! Orders are snapshots of a cart taken at checkout. Line items never change
//! after creation; only the status moves.
//!
//! ```text
//!  Not Paid ──payment success──▶ Ready To Ship ──▶ Shipped ──▶ Delivered
//!     │                              │
//!     └──────────cancel──────────────┴──▶ Canceled
//! ```
//!
//! Staff may additionally set any status label through `update_status`.

use crate::cart::CartId;
use crate::error::{CommerceError, CommerceResult};
use crate::product::{Currency, Price, ProductCatalog};
use crate::store::SharedStore;
use crate::user::{User, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub type OrderId = u64;

/// Order status, serialized as its human-readable label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    NotPaid,
    ReadyToShip,
    Shipped,
    Delivered,
    Canceled,
    /// Any other label set by staff
    Custom(String),
}

impl OrderStatus {
    pub fn label(&self) -> &str {
        match self {
            OrderStatus::NotPaid => "Not Paid",
            OrderStatus::ReadyToShip => "Ready To Ship",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Custom(label) => label,
        }
    }

    /// Known labels map to their variant, anything else is `Custom`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Not Paid" => OrderStatus::NotPaid,
            "Ready To Ship" => OrderStatus::ReadyToShip,
            "Shipped" => OrderStatus::Shipped,
            "Delivered" => OrderStatus::Delivered,
            "Canceled" => OrderStatus::Canceled,
            other => OrderStatus::Custom(other.to_string()),
        }
    }

    pub fn is_cancelable(&self) -> bool {
        !matches!(
            self,
            OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Canceled
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::NotPaid
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(OrderStatus::from_label(&label))
    }
}

/// A purchased line, frozen at order time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: u64,
    pub product_id: String,
    /// Product name (denormalized for display)
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub total_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_price: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Units across all lines, saturating at `u32::MAX`
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |count, i| count.saturating_add(i.quantity))
    }

    pub fn is_owned_by(&self, user: &User) -> bool {
        self.user_id == user.id
    }
}

/// Order line before the store assigns ids
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub total_price: Price,
}

/// Order before the store assigns ids and timestamps
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
    pub total_price: Price,
}

fn out_of_range() -> CommerceError {
    CommerceError::InvalidRequest("Order total is out of range".to_string())
}

/// Order lifecycle operations
#[derive(Clone)]
pub struct OrderService {
    store: SharedStore,
    catalog: Arc<ProductCatalog>,
    currency: Currency,
}

impl OrderService {
    pub fn new(store: SharedStore, catalog: Arc<ProductCatalog>, currency: Currency) -> Self {
        Self {
            store,
            catalog,
            currency,
        }
    }

    /// Snapshot the caller's cart into a new order, then drop the cart.
    ///
    /// The two writes are not transactional: if deleting the cart fails the
    /// order still exists and the error is logged.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn create_from_cart(&self, user: &User, cart_id: CartId) -> CommerceResult<Order> {
        let cart = self
            .store
            .get_cart(cart_id)
            .await?
            .ok_or(CommerceError::CartNotFound)?;
        if cart.user_id != user.id {
            return Err(CommerceError::PermissionDenied("Not your cart.".to_string()));
        }
        if cart.is_empty() {
            return Err(CommerceError::InvalidRequest("Cart is empty".to_string()));
        }

        let mut items = Vec::with_capacity(cart.items.len());
        let mut total = 0_i64;
        for line in &cart.items {
            let product = self.catalog.get(&line.product_id).ok_or_else(|| {
                CommerceError::ProductNotFound {
                    product_id: line.product_id.clone(),
                }
            })?;
            if product.price.currency != self.currency {
                return Err(CommerceError::InvalidRequest(format!(
                    "Product {} is priced in {}, orders are in {}",
                    product.id, product.price.currency, self.currency
                )));
            }
            let line_total = product
                .price
                .times(line.quantity)
                .ok_or_else(out_of_range)?;
            total = total.checked_add(line_total.amount).ok_or_else(out_of_range)?;
            items.push(NewOrderItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price,
                total_price: line_total,
            });
        }

        let order = self
            .store
            .insert_order(NewOrder {
                user_id: user.id,
                status: OrderStatus::NotPaid,
                items,
                total_price: Price::from_minor(total, self.currency),
            })
            .await?;
        info!(
            "Created order {}: {} items, total={}",
            order.id,
            order.item_count(),
            order.total_price.display()
        );

        if let Err(e) = self.store.delete_cart(cart_id).await {
            warn!("Order {} created but cart {} not cleared: {}", order.id, cart_id, e);
        }
        Ok(order)
    }

    /// Staff see every order, customers only their own.
    pub async fn list(&self, user: &User) -> CommerceResult<Vec<Order>> {
        let owner = if user.is_staff { None } else { Some(user.id) };
        self.store.list_orders(owner).await
    }

    /// Fetch an order visible to `user`
    pub async fn get(&self, user: &User, order_id: OrderId) -> CommerceResult<Order> {
        self.store
            .get_order(order_id)
            .await?
            .filter(|o| user.is_staff || o.is_owned_by(user))
            .ok_or(CommerceError::OrderNotFound { order_id })
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn cancel(&self, user: &User, order_id: OrderId) -> CommerceResult<Order> {
        // Orders of other customers are reported as missing.
        let order = self.get(user, order_id).await?;
        if !order.status.is_cancelable() {
            return Err(CommerceError::InvalidTransition {
                order_id,
                from: order.status.to_string(),
                to: OrderStatus::Canceled.to_string(),
            });
        }
        let order = self.set_status(order_id, OrderStatus::Canceled).await?;
        info!("Order {} canceled", order_id);
        Ok(order)
    }

    /// Staff override: any non-empty label is accepted.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn update_status(
        &self,
        user: &User,
        order_id: OrderId,
        label: &str,
    ) -> CommerceResult<Order> {
        if !user.is_staff {
            return Err(CommerceError::PermissionDenied(
                "You do not have permission to perform this action.".to_string(),
            ));
        }
        let label = label.trim();
        if label.is_empty() {
            return Err(CommerceError::InvalidRequest(
                "status must not be empty".to_string(),
            ));
        }
        let order = self.set_status(order_id, OrderStatus::from_label(label)).await?;
        info!("Order {} status set to '{}'", order_id, order.status);
        Ok(order)
    }

    /// Mark an order paid after a verified gateway callback.
    ///
    /// Only a "Not Paid" order moves to "Ready To Ship". A repeat on an order
    /// that is already ready to ship is a no-op; any other status is kept.
    pub async fn mark_paid(&self, order_id: OrderId) -> CommerceResult<Order> {
        let order = self
            .store
            .transition_order_status(order_id, &OrderStatus::NotPaid, OrderStatus::ReadyToShip)
            .await?
            .ok_or(CommerceError::OrderNotFound { order_id })?;
        if order.status != OrderStatus::ReadyToShip {
            return Err(CommerceError::InvalidTransition {
                order_id,
                from: order.status.to_string(),
                to: OrderStatus::ReadyToShip.to_string(),
            });
        }
        info!("Order {} is ready to ship", order_id);
        Ok(order)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &User, order_id: OrderId) -> CommerceResult<()> {
        if !user.is_staff {
            return Err(CommerceError::PermissionDenied(
                "You do not have permission to perform this action.".to_string(),
            ));
        }
        if !self.store.delete_order(order_id).await? {
            return Err(CommerceError::OrderNotFound { order_id });
        }
        info!("Order {} deleted", order_id);
        Ok(())
    }

    /// Has the user ever ordered the product, whatever became of the order.
    pub async fn has_ordered_product(&self, user: &User, product_id: &str) -> CommerceResult<bool> {
        self.store.has_ordered_product(user.id, product_id).await
    }

    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> CommerceResult<Order> {
        self.store
            .set_order_status(order_id, status)
            .await?
            .ok_or(CommerceError::OrderNotFound { order_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartService;
    use crate::memory::InMemoryStore;
    use crate::product::Product;

    struct Fixture {
        carts: CartService,
        orders: OrderService,
    }

    fn fixture() -> Fixture {
        let store: SharedStore = Arc::new(InMemoryStore::new());
        let catalog = Arc::new(
            ProductCatalog::new()
                .with_product(Product::new("tea", "Tea", Price::new(150.0, Currency::BDT)))
                .with_product(Product::new("mug", "Mug", Price::new(300.0, Currency::BDT))),
        );
        Fixture {
            carts: CartService::new(store.clone(), catalog.clone()),
            orders: OrderService::new(store, catalog, Currency::BDT),
        }
    }

    fn alice() -> User {
        User::new(1, "alice-token", "alice@example.com")
    }

    fn bob() -> User {
        User::new(2, "bob-token", "bob@example.com")
    }

    fn admin() -> User {
        User::new(9, "admin-token", "admin@example.com").staff()
    }

    async fn place_order(f: &Fixture, user: &User) -> Order {
        let (cart, _) = f.carts.create(user).await.unwrap();
        f.carts.add_item(user, cart.id, "tea", 2).await.unwrap();
        f.carts.add_item(user, cart.id, "mug", 1).await.unwrap();
        f.orders.create_from_cart(user, cart.id).await.unwrap()
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(OrderStatus::ReadyToShip.label(), "Ready To Ship");
        assert_eq!(OrderStatus::from_label("Canceled"), OrderStatus::Canceled);
        assert_eq!(
            OrderStatus::from_label("Lost In Transit"),
            OrderStatus::Custom("Lost In Transit".to_string())
        );
        let json = serde_json::to_string(&OrderStatus::NotPaid).unwrap();
        assert_eq!(json, "\"Not Paid\"");
        let parsed: OrderStatus = serde_json::from_str("\"Shipped\"").unwrap();
        assert_eq!(parsed, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_create_snapshots_cart_and_clears_it() {
        let f = fixture();
        let order = place_order(&f, &alice()).await;

        assert_eq!(order.status, OrderStatus::NotPaid);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.total_price.amount, 60_000);
        assert!(f.carts.mine(&alice()).await.is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_or_foreign_cart() {
        let f = fixture();
        let (cart, _) = f.carts.create(&alice()).await.unwrap();

        let err = f.orders.create_from_cart(&alice(), cart.id).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = f.orders.create_from_cart(&bob(), cart.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_visibility() {
        let f = fixture();
        let order = place_order(&f, &alice()).await;
        place_order(&f, &bob()).await;

        assert_eq!(f.orders.list(&alice()).await.unwrap().len(), 1);
        assert_eq!(f.orders.list(&admin()).await.unwrap().len(), 2);
        assert!(f.orders.get(&bob(), order.id).await.is_err());
        assert!(f.orders.get(&admin(), order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel() {
        let f = fixture();
        let order = place_order(&f, &alice()).await;

        assert!(f.orders.cancel(&bob(), order.id).await.is_err());
        let canceled = f.orders.cancel(&alice(), order.id).await.unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled);

        let err = f.orders.cancel(&alice(), order.id).await.unwrap_err();
        assert!(matches!(err, CommerceError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_cannot_cancel_delivered_order() {
        let f = fixture();
        let order = place_order(&f, &alice()).await;
        f.orders
            .update_status(&admin(), order.id, "Delivered")
            .await
            .unwrap();

        let err = f.orders.cancel(&alice(), order.id).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_update_status_accepts_any_label_for_staff() {
        let f = fixture();
        let order = place_order(&f, &alice()).await;

        let err = f
            .orders
            .update_status(&alice(), order.id, "Shipped")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let updated = f
            .orders
            .update_status(&admin(), order.id, "Waiting For Pickup")
            .await
            .unwrap();
        assert_eq!(updated.status.label(), "Waiting For Pickup");

        assert!(f.orders.update_status(&admin(), order.id, "  ").await.is_err());
    }

    #[tokio::test]
    async fn test_mark_paid() {
        let f = fixture();
        let order = place_order(&f, &alice()).await;
        let paid = f.orders.mark_paid(order.id).await.unwrap();
        assert_eq!(paid.status, OrderStatus::ReadyToShip);

        assert!(matches!(
            f.orders.mark_paid(999).await.unwrap_err(),
            CommerceError::OrderNotFound { order_id: 999 }
        ));
    }

    #[tokio::test]
    async fn test_mark_paid_only_moves_unpaid_orders() {
        let f = fixture();
        let order = place_order(&f, &alice()).await;
        f.orders.mark_paid(order.id).await.unwrap();
        let again = f.orders.mark_paid(order.id).await.unwrap();
        assert_eq!(again.status, OrderStatus::ReadyToShip);

        f.orders
            .update_status(&admin(), order.id, "Shipped")
            .await
            .unwrap();
        let err = f.orders.mark_paid(order.id).await.unwrap_err();
        assert!(matches!(err, CommerceError::InvalidTransition { .. }));

        let canceled = place_order(&f, &bob()).await;
        f.orders.cancel(&bob(), canceled.id).await.unwrap();
        assert!(f.orders.mark_paid(canceled.id).await.is_err());

        let current = f.orders.get(&admin(), order.id).await.unwrap();
        assert_eq!(current.status, OrderStatus::Shipped);
        let current = f.orders.get(&admin(), canceled.id).await.unwrap();
        assert_eq!(current.status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn test_create_rejects_total_out_of_range() {
        let store: SharedStore = Arc::new(InMemoryStore::new());
        let catalog = Arc::new(ProductCatalog::new().with_product(Product::new(
            "gold",
            "Gold",
            Price::from_minor(i64::MAX / 2, Currency::BDT),
        )));
        let carts = CartService::new(store.clone(), catalog.clone());
        let orders = OrderService::new(store, catalog, Currency::BDT);

        let (cart, _) = carts.create(&alice()).await.unwrap();
        carts.add_item(&alice(), cart.id, "gold", 3).await.unwrap();

        let err = orders.create_from_cart(&alice(), cart.id).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(carts.mine(&alice()).await.is_ok());
        assert!(orders.list(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_has_ordered_product_counts_canceled_orders() {
        let f = fixture();
        assert!(!f.orders.has_ordered_product(&alice(), "tea").await.unwrap());

        let order = place_order(&f, &alice()).await;
        f.orders.cancel(&alice(), order.id).await.unwrap();

        assert!(f.orders.has_ordered_product(&alice(), "tea").await.unwrap());
        assert!(!f.orders.has_ordered_product(&bob(), "tea").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_staff_only() {
        let f = fixture();
        let order = place_order(&f, &alice()).await;
        assert!(f.orders.delete(&alice(), order.id).await.is_err());
        f.orders.delete(&admin(), order.id).await.unwrap();
        assert!(f.orders.get(&admin(), order.id).await.is_err());
    }
}
