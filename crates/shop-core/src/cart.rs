//! # Carts
//!
//! One cart per user, holding product lines. A user may only read or
//! change their own cart; foreign carts look like missing ones, except
//! when adding an item, which is an explicit permission error.

use crate::error::{CommerceError, CommerceResult};
use crate::product::{Currency, Price, ProductCatalog};
use crate::store::SharedStore;
use crate::user::{User, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub type CartId = Uuid;
pub type CartItemId = u64;

/// Largest quantity a single cart line may hold
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// A line in a cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: String,
    /// Between 1 and [`MAX_LINE_QUANTITY`]
    pub quantity: u32,
}

/// A user's cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Sum of line prices at current catalog prices. Lines whose product has
    /// left the catalog count as zero. Saturates instead of overflowing.
    pub fn total(&self, catalog: &ProductCatalog, currency: Currency) -> Price {
        let amount = self
            .items
            .iter()
            .filter_map(|i| {
                let product = catalog.get(&i.product_id)?;
                Some(product.price.times(i.quantity).map_or(i64::MAX, |t| t.amount))
            })
            .fold(0_i64, i64::saturating_add);
        Price::from_minor(amount, currency)
    }
}

fn validate_quantity(quantity: u32) -> CommerceResult<()> {
    if quantity == 0 {
        return Err(CommerceError::InvalidRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(CommerceError::InvalidRequest(format!(
            "Quantity must be at most {}",
            MAX_LINE_QUANTITY
        )));
    }
    Ok(())
}

/// Owner-scoped cart operations
#[derive(Clone)]
pub struct CartService {
    store: SharedStore,
    catalog: Arc<ProductCatalog>,
}

impl CartService {
    pub fn new(store: SharedStore, catalog: Arc<ProductCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Returns the caller's cart and whether it was created now.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn create(&self, user: &User) -> CommerceResult<(Cart, bool)> {
        let (cart, created) = self.store.get_or_create_cart(user.id).await?;
        if created {
            info!("Created cart {}", cart.id);
        } else {
            debug!("Returning existing cart {}", cart.id);
        }
        Ok((cart, created))
    }

    pub async fn mine(&self, user: &User) -> CommerceResult<Cart> {
        self.store
            .cart_for_user(user.id)
            .await?
            .ok_or(CommerceError::CartNotFound)
    }

    /// The cart if it exists and belongs to `user`
    async fn owned(&self, user: &User, cart_id: CartId) -> CommerceResult<Option<Cart>> {
        Ok(self
            .store
            .get_cart(cart_id)
            .await?
            .filter(|c| c.user_id == user.id))
    }

    pub async fn get(&self, user: &User, cart_id: CartId) -> CommerceResult<Cart> {
        self.owned(user, cart_id)
            .await?
            .ok_or(CommerceError::CartNotFound)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn delete(&self, user: &User, cart_id: CartId) -> CommerceResult<()> {
        self.get(user, cart_id).await?;
        self.store.delete_cart(cart_id).await?;
        info!("Deleted cart {}", cart_id);
        Ok(())
    }

    /// Items of the caller's cart. A cart the caller does not own lists as empty.
    pub async fn list_items(&self, user: &User, cart_id: CartId) -> CommerceResult<Vec<CartItem>> {
        Ok(self
            .owned(user, cart_id)
            .await?
            .map(|c| c.items)
            .unwrap_or_default())
    }

    pub async fn get_item(
        &self,
        user: &User,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> CommerceResult<CartItem> {
        self.owned(user, cart_id)
            .await?
            .and_then(|c| c.item(item_id).cloned())
            .ok_or(CommerceError::CartItemNotFound { item_id })
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn add_item(
        &self,
        user: &User,
        cart_id: CartId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<CartItem> {
        if self.owned(user, cart_id).await?.is_none() {
            return Err(CommerceError::PermissionDenied("Not your cart.".to_string()));
        }
        validate_quantity(quantity)?;

        let product = self
            .catalog
            .get(product_id)
            .ok_or_else(|| CommerceError::ProductNotFound {
                product_id: product_id.to_string(),
            })?;
        if !product.active {
            return Err(CommerceError::ProductUnavailable {
                product_id: product_id.to_string(),
            });
        }

        let item = self
            .store
            .add_cart_item(cart_id, product_id, quantity)
            .await?
            // Deleted between the ownership check and the insert.
            .ok_or(CommerceError::CartNotFound)?;
        info!("Cart {} now holds {} x {}", cart_id, item.quantity, product_id);
        Ok(item)
    }

    pub async fn update_item(
        &self,
        user: &User,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> CommerceResult<CartItem> {
        validate_quantity(quantity)?;
        self.get_item(user, cart_id, item_id).await?;
        self.store
            .set_cart_item_quantity(cart_id, item_id, quantity)
            .await?
            .ok_or(CommerceError::CartItemNotFound { item_id })
    }

    pub async fn remove_item(
        &self,
        user: &User,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> CommerceResult<()> {
        self.get_item(user, cart_id, item_id).await?;
        if !self.store.delete_cart_item(cart_id, item_id).await? {
            return Err(CommerceError::CartItemNotFound { item_id });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::product::Product;

    fn service() -> CartService {
        let catalog = ProductCatalog::new()
            .with_product(Product::new("tea", "Tea", Price::new(150.0, Currency::BDT)))
            .with_product(Product::new("mug", "Mug", Price::new(300.0, Currency::BDT)))
            .with_product(Product::new("old", "Old", Price::new(1.0, Currency::BDT)).inactive());
        CartService::new(Arc::new(InMemoryStore::new()), Arc::new(catalog))
    }

    fn alice() -> User {
        User::new(1, "alice-token", "alice@example.com")
    }

    fn bob() -> User {
        User::new(2, "bob-token", "bob@example.com")
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let carts = service();
        let (first, created) = carts.create(&alice()).await.unwrap();
        assert!(created);
        let (second, created) = carts.create(&alice()).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_mine_not_found_then_found() {
        let carts = service();
        let err = carts.mine(&alice()).await.unwrap_err();
        assert!(matches!(err, CommerceError::CartNotFound));

        let (cart, _) = carts.create(&alice()).await.unwrap();
        assert_eq!(carts.mine(&alice()).await.unwrap().id, cart.id);
    }

    #[tokio::test]
    async fn test_cannot_add_to_foreign_cart() {
        let carts = service();
        let (cart, _) = carts.create(&alice()).await.unwrap();

        let err = carts.add_item(&bob(), cart.id, "tea", 1).await.unwrap_err();
        assert!(matches!(err, CommerceError::PermissionDenied(ref m) if m == "Not your cart."));
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_foreign_cart_is_invisible() {
        let carts = service();
        let (cart, _) = carts.create(&alice()).await.unwrap();
        let item = carts.add_item(&alice(), cart.id, "tea", 1).await.unwrap();

        assert!(carts.list_items(&bob(), cart.id).await.unwrap().is_empty());
        assert!(matches!(
            carts.get(&bob(), cart.id).await.unwrap_err(),
            CommerceError::CartNotFound
        ));
        assert!(carts.get_item(&bob(), cart.id, item.id).await.is_err());
        assert!(carts.remove_item(&bob(), cart.id, item.id).await.is_err());
        assert!(carts.delete(&bob(), cart.id).await.is_err());
        assert_eq!(carts.list_items(&alice(), cart.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_item_validation() {
        let carts = service();
        let (cart, _) = carts.create(&alice()).await.unwrap();

        let err = carts.add_item(&alice(), cart.id, "tea", 0).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = carts.add_item(&alice(), cart.id, "tea", u32::MAX).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = carts.add_item(&alice(), cart.id, "coffee", 1).await.unwrap_err();
        assert!(matches!(err, CommerceError::ProductNotFound { .. }));

        let err = carts.add_item(&alice(), cart.id, "old", 1).await.unwrap_err();
        assert!(matches!(err, CommerceError::ProductUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_merged_quantity_is_capped() {
        let carts = service();
        let (cart, _) = carts.create(&alice()).await.unwrap();
        carts
            .add_item(&alice(), cart.id, "tea", MAX_LINE_QUANTITY)
            .await
            .unwrap();

        let err = carts.add_item(&alice(), cart.id, "tea", 1).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let items = carts.list_items(&alice(), cart.id).await.unwrap();
        assert_eq!(items[0].quantity, MAX_LINE_QUANTITY);
    }

    #[tokio::test]
    async fn test_update_and_remove_item() {
        let carts = service();
        let (cart, _) = carts.create(&alice()).await.unwrap();
        let item = carts.add_item(&alice(), cart.id, "tea", 1).await.unwrap();

        let updated = carts.update_item(&alice(), cart.id, item.id, 4).await.unwrap();
        assert_eq!(updated.quantity, 4);
        assert!(carts.update_item(&alice(), cart.id, item.id, 0).await.is_err());
        assert!(carts
            .update_item(&alice(), cart.id, item.id, MAX_LINE_QUANTITY + 1)
            .await
            .is_err());

        carts.remove_item(&alice(), cart.id, item.id).await.unwrap();
        assert!(carts.list_items(&alice(), cart.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cart_total() {
        let carts = service();
        let (cart, _) = carts.create(&alice()).await.unwrap();
        assert_eq!(cart.total(&carts.catalog, Currency::BDT).amount, 0);

        carts.add_item(&alice(), cart.id, "tea", 2).await.unwrap();
        carts.add_item(&alice(), cart.id, "mug", 1).await.unwrap();
        let cart = carts.mine(&alice()).await.unwrap();
        assert_eq!(cart.total(&carts.catalog, Currency::BDT).amount, 60_000);
    }
}
