//! # Payment Bridge
//!
//! Turns an order into a hosted checkout session and applies the gateway's
//! callbacks to the order afterwards.

use crate::callback::{CallbackRoute, CallbackSigner, TransactionId};
use crate::error::{CommerceError, CommerceResult};
use crate::gateway::{
    BoxedPaymentGateway, CallbackUrls, CustomerProfile, PaymentSession, PaymentSessionRequest,
};
use crate::order::{Order, OrderId, OrderService, OrderStatus};
use crate::user::User;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

/// Payment initiation input, as posted by the storefront
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePayment {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    /// Decimal amount in major units; must match the order total when given
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub num_items: Option<u32>,
}

/// Fields of a gateway callback we look at. The gateway posts many more.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayCallback {
    #[serde(default)]
    pub tran_id: Option<String>,
    #[serde(default)]
    pub val_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

/// Non-success callback kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Failed,
    Canceled,
}

/// Static session fields the storefront does not supply per order
#[derive(Debug, Clone)]
pub struct CheckoutDefaults {
    pub city: String,
    pub country: String,
    pub shipping_method: String,
    pub product_name: String,
    pub product_category: String,
    pub product_profile: String,
}

impl Default for CheckoutDefaults {
    fn default() -> Self {
        Self {
            city: "Dhaka".to_string(),
            country: "Bangladesh".to_string(),
            shipping_method: "Courier".to_string(),
            product_name: "E-commerce Products".to_string(),
            product_category: "General".to_string(),
            product_profile: "general".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct PaymentBridge {
    gateway: BoxedPaymentGateway,
    orders: OrderService,
    signer: CallbackSigner,
    backend_url: String,
    defaults: CheckoutDefaults,
}

impl PaymentBridge {
    pub fn new(
        gateway: BoxedPaymentGateway,
        orders: OrderService,
        signer: CallbackSigner,
        backend_url: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            orders,
            signer,
            backend_url: backend_url.into(),
            defaults: CheckoutDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: CheckoutDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.gateway.provider_name()
    }

    /// Build the session request for `order` on behalf of `user`.
    pub fn session_request(&self, user: &User, order: &Order, num_items: u32) -> PaymentSessionRequest {
        let transaction_id = TransactionId::for_order(order.id).to_string();
        PaymentSessionRequest {
            urls: CallbackUrls::under(&self.backend_url, |route| {
                self.signer.sign(route, &transaction_id)
            }),
            transaction_id,
            amount: order.total_price,
            num_items,
            customer: CustomerProfile {
                name: user.full_name(),
                email: user.email.clone(),
                phone: user.phone_number.clone(),
                address: user.address.clone(),
                city: user.city.clone().unwrap_or_else(|| self.defaults.city.clone()),
                country: user
                    .country
                    .clone()
                    .unwrap_or_else(|| self.defaults.country.clone()),
            },
            shipping_method: self.defaults.shipping_method.clone(),
            product_name: self.defaults.product_name.clone(),
            product_category: self.defaults.product_category.clone(),
            product_profile: self.defaults.product_profile.clone(),
        }
    }

    /// Open a gateway session for one of the caller's unpaid orders.
    #[instrument(skip(self, user, request), fields(user_id = user.id, order_id = ?request.order_id))]
    pub async fn initiate(
        &self,
        user: &User,
        request: InitiatePayment,
    ) -> CommerceResult<PaymentSession> {
        let order_id = request
            .order_id
            .ok_or_else(|| CommerceError::InvalidRequest("orderId is required".to_string()))?;
        let order = self.orders.get(user, order_id).await?;

        if order.status != OrderStatus::NotPaid {
            return Err(CommerceError::InvalidRequest(format!(
                "Order {} is '{}' and cannot be paid",
                order.id, order.status
            )));
        }

        if let Some(amount) = request.amount {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(CommerceError::InvalidRequest(
                    "amount must be a positive number".to_string(),
                ));
            }
            let minor = order.total_price.currency.to_smallest_unit(amount);
            if minor != order.total_price.amount {
                return Err(CommerceError::InvalidRequest(format!(
                    "amount {} does not match order total {}",
                    amount,
                    order.total_price.decimal_string()
                )));
            }
        }

        let num_items = match request.num_items {
            Some(0) => {
                return Err(CommerceError::InvalidRequest(
                    "numItems must be at least 1".to_string(),
                ))
            }
            Some(n) => n,
            None => order.item_count(),
        };

        let session_request = self.session_request(user, &order, num_items);
        info!(
            "Initiating {} payment: txn={}, total={}",
            self.gateway.provider_name(),
            session_request.transaction_id,
            order.total_price.display()
        );

        let session = self
            .gateway
            .create_session(&session_request)
            .await
            .map_err(|e| {
                if e.is_retryable() {
                    warn!("Gateway unavailable: {}", e);
                } else {
                    error!("Gateway rejected session: {}", e);
                }
                CommerceError::PaymentInitiationFailed
            })?;

        info!("Payment session ready for txn={}", session.transaction_id);
        Ok(session)
    }

    /// Apply a success callback. Verifies the success-route signature before
    /// parsing the transaction id or touching the order. Repeating the
    /// callback for a paid order is harmless; any later status is refused.
    #[instrument(skip(self, callback, signature), fields(tran_id = ?callback.tran_id))]
    pub async fn confirm_success(
        &self,
        callback: &GatewayCallback,
        signature: Option<&str>,
    ) -> CommerceResult<Order> {
        let raw = callback.tran_id.as_deref().unwrap_or_default();
        self.signer.verify(CallbackRoute::Success, raw, signature)?;
        let transaction = TransactionId::parse(raw)?;
        let order = self.orders.mark_paid(transaction.order_id()).await?;
        info!(
            "Payment confirmed: txn={}, val_id={:?}",
            transaction, callback.val_id
        );
        Ok(order)
    }

    /// Failed and canceled payments leave the order untouched.
    pub fn record_outcome(&self, outcome: CallbackOutcome, callback: &GatewayCallback) {
        match outcome {
            CallbackOutcome::Failed => warn!(
                "Payment failed: tran_id={:?}, status={:?}",
                callback.tran_id, callback.status
            ),
            CallbackOutcome::Canceled => info!("Payment canceled: tran_id={:?}", callback.tran_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartService;
    use crate::gateway::PaymentGateway;
    use crate::memory::InMemoryStore;
    use crate::product::{Currency, Price, Product, ProductCatalog};
    use crate::store::SharedStore;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    const SECRET: &str = "payment-bridge-test-secret";

    #[derive(Default)]
    struct RecordingGateway {
        fail: bool,
        seen: Mutex<Vec<PaymentSessionRequest>>,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_session(
            &self,
            request: &PaymentSessionRequest,
        ) -> CommerceResult<PaymentSession> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(CommerceError::ProviderError {
                    provider: "recording".into(),
                    message: "FAILED".into(),
                });
            }
            Ok(PaymentSession {
                transaction_id: request.transaction_id.clone(),
                provider: "recording".into(),
                gateway_url: format!("https://pay.example.com/{}", request.transaction_id),
                session_key: None,
            })
        }

        fn provider_name(&self) -> &'static str {
            "recording"
        }
    }

    struct Fixture {
        carts: CartService,
        orders: OrderService,
        gateway: Arc<RecordingGateway>,
        bridge: PaymentBridge,
    }

    fn fixture(fail: bool) -> Fixture {
        let store: SharedStore = Arc::new(InMemoryStore::new());
        let catalog = Arc::new(
            ProductCatalog::new()
                .with_product(Product::new("tea", "Tea", Price::new(150.0, Currency::BDT))),
        );
        let orders = OrderService::new(store.clone(), catalog.clone(), Currency::BDT);
        let gateway = Arc::new(RecordingGateway {
            fail,
            ..Default::default()
        });
        let bridge = PaymentBridge::new(
            gateway.clone(),
            orders.clone(),
            CallbackSigner::new(SECRET).unwrap(),
            "https://api.example.com",
        );
        Fixture {
            carts: CartService::new(store, catalog),
            orders,
            gateway,
            bridge,
        }
    }

    fn alice() -> User {
        User::new(1, "alice-token", "alice@example.com")
            .with_name("Alice", "Khan")
            .with_contact("01700000000", "House 1, Road 2")
    }

    async fn place_order(f: &Fixture) -> Order {
        let (cart, _) = f.carts.create(&alice()).await.unwrap();
        f.carts.add_item(&alice(), cart.id, "tea", 2).await.unwrap();
        f.orders.create_from_cart(&alice(), cart.id).await.unwrap()
    }

    fn request(order_id: OrderId) -> InitiatePayment {
        InitiatePayment {
            order_id: Some(order_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_initiate_builds_session_request() {
        let f = fixture(false);
        let order = place_order(&f).await;

        let session = f.bridge.initiate(&alice(), request(order.id)).await.unwrap();
        assert_eq!(session.transaction_id, format!("txn_{}", order.id));

        let seen = f.gateway.seen.lock().unwrap();
        let sent = &seen[0];
        assert_eq!(sent.amount.amount, 30_000);
        assert_eq!(sent.num_items, 2);
        assert_eq!(sent.customer.name, "Alice Khan");
        assert_eq!(sent.customer.city, "Dhaka");
        assert_eq!(sent.customer.country, "Bangladesh");
        assert!(sent
            .urls
            .success_url
            .starts_with("https://api.example.com/api/v1/payment/success/?sig="));
    }

    #[tokio::test]
    async fn test_initiate_validates_input() {
        let f = fixture(false);
        let order = place_order(&f).await;

        let missing = f
            .bridge
            .initiate(&alice(), InitiatePayment::default())
            .await
            .unwrap_err();
        assert_eq!(missing.status_code(), 400);

        let wrong_amount = InitiatePayment {
            amount: Some(1.0),
            ..request(order.id)
        };
        assert!(f.bridge.initiate(&alice(), wrong_amount).await.is_err());

        let zero_items = InitiatePayment {
            num_items: Some(0),
            ..request(order.id)
        };
        assert!(f.bridge.initiate(&alice(), zero_items).await.is_err());

        let exact = InitiatePayment {
            amount: Some(300.0),
            num_items: Some(5),
            ..request(order.id)
        };
        assert!(f.bridge.initiate(&alice(), exact).await.is_ok());
        assert!(f.gateway.seen.lock().unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_initiate_rejects_foreign_or_canceled_order() {
        let f = fixture(false);
        let order = place_order(&f).await;

        let bob = User::new(2, "bob-token", "bob@example.com");
        let err = f.bridge.initiate(&bob, request(order.id)).await.unwrap_err();
        assert_eq!(err.status_code(), 404);

        f.orders.cancel(&alice(), order.id).await.unwrap();
        let err = f.bridge.initiate(&alice(), request(order.id)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_gateway_failure_is_generic() {
        let f = fixture(true);
        let order = place_order(&f).await;
        let err = f.bridge.initiate(&alice(), request(order.id)).await.unwrap_err();
        assert!(matches!(err, CommerceError::PaymentInitiationFailed));
    }

    #[tokio::test]
    async fn test_confirm_success_marks_order() {
        let f = fixture(false);
        let order = place_order(&f).await;
        let tran_id = format!("txn_{}", order.id);
        let sig = CallbackSigner::new(SECRET)
            .unwrap()
            .sign(CallbackRoute::Success, &tran_id);
        let callback = GatewayCallback {
            tran_id: Some(tran_id),
            ..Default::default()
        };

        let paid = f.bridge.confirm_success(&callback, Some(&sig)).await.unwrap();
        assert_eq!(paid.status, OrderStatus::ReadyToShip);

        // The gateway may deliver the same callback twice.
        let again = f.bridge.confirm_success(&callback, Some(&sig)).await.unwrap();
        assert_eq!(again.status, OrderStatus::ReadyToShip);
    }

    #[tokio::test]
    async fn test_only_success_url_signature_confirms() {
        let f = fixture(false);
        let order = place_order(&f).await;
        f.bridge.initiate(&alice(), request(order.id)).await.unwrap();

        let sent = f.gateway.seen.lock().unwrap()[0].clone();
        let sig_of = |url: &str| url.split("?sig=").nth(1).unwrap().to_string();
        let callback = GatewayCallback {
            tran_id: Some(sent.transaction_id.clone()),
            ..Default::default()
        };

        for url in [&sent.urls.fail_url, &sent.urls.cancel_url] {
            let err = f
                .bridge
                .confirm_success(&callback, Some(&sig_of(url)))
                .await
                .unwrap_err();
            assert!(matches!(err, CommerceError::CallbackVerificationFailed(_)));
        }
        assert_eq!(
            f.orders.get(&alice(), order.id).await.unwrap().status,
            OrderStatus::NotPaid
        );

        let paid = f
            .bridge
            .confirm_success(&callback, Some(&sig_of(&sent.urls.success_url)))
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::ReadyToShip);
    }

    #[tokio::test]
    async fn test_replayed_success_cannot_rewind_status() {
        let f = fixture(false);
        let order = place_order(&f).await;
        let tran_id = format!("txn_{}", order.id);
        let sig = CallbackSigner::new(SECRET)
            .unwrap()
            .sign(CallbackRoute::Success, &tran_id);
        let callback = GatewayCallback {
            tran_id: Some(tran_id),
            ..Default::default()
        };

        f.bridge.confirm_success(&callback, Some(&sig)).await.unwrap();
        let admin = User::new(9, "admin-token", "admin@example.com").staff();
        f.orders
            .update_status(&admin, order.id, "Shipped")
            .await
            .unwrap();

        let err = f
            .bridge
            .confirm_success(&callback, Some(&sig))
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::InvalidTransition { .. }));
        assert_eq!(
            f.orders.get(&alice(), order.id).await.unwrap().status,
            OrderStatus::Shipped
        );
    }

    #[tokio::test]
    async fn test_confirm_success_rejections() {
        let f = fixture(false);
        let order = place_order(&f).await;
        let signer = CallbackSigner::new(SECRET).unwrap();
        let callback = |tran_id: &str| GatewayCallback {
            tran_id: Some(tran_id.to_string()),
            ..Default::default()
        };

        let tran_id = format!("txn_{}", order.id);
        let unsigned = f.bridge.confirm_success(&callback(&tran_id), None).await;
        assert_eq!(unsigned.unwrap_err().status_code(), 401);

        let malformed = f
            .bridge
            .confirm_success(
                &callback("txn42"),
                Some(&signer.sign(CallbackRoute::Success, "txn42")),
            )
            .await;
        assert!(matches!(
            malformed.unwrap_err(),
            CommerceError::MalformedTransactionId(_)
        ));

        let unknown = f
            .bridge
            .confirm_success(
                &callback("txn_999"),
                Some(&signer.sign(CallbackRoute::Success, "txn_999")),
            )
            .await;
        assert_eq!(unknown.unwrap_err().status_code(), 404);

        let untouched = f.orders.get(&alice(), order.id).await.unwrap();
        assert_eq!(untouched.status, OrderStatus::NotPaid);
    }
}
