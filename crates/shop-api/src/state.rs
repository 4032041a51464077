//! # Application State
//!
//! Shared state for the Axum application.
//! Contains configuration, the product catalog, the user directory, the
//! access policy and the cart / order / payment services.

use crate::auth::Caller;
use crate::error::ApiError;
use shop_core::{
    AccessPolicy, BoxedPaymentGateway, CallbackSigner, CartService, CheckoutDefaults,
    CommerceError, CommerceResult, Currency, InMemoryStore, Operation, OrderService,
    PaymentBridge, ProductCatalog, SharedStore, User, UserDirectory,
};
use shop_sslcommerz::SslCommerzGateway;
use std::net::SocketAddr;
use std::sync::Arc;

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this API, used for gateway callbacks
    pub backend_url: String,
    /// Storefront base URL, target of post-payment redirects
    pub frontend_url: String,
    /// Storefront page listing the shopper's orders
    pub dashboard_path: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Shared secret for signing callback URLs
    pub callback_secret: String,
    /// Product catalog file
    pub products_path: String,
    /// User directory file
    pub users_path: String,
    /// Currency orders are charged in
    pub currency: Currency,
    /// Fallback customer city for the payment gateway
    pub default_city: String,
    /// Fallback customer country for the payment gateway
    pub default_country: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("backend_url", &self.backend_url)
            .field("frontend_url", &self.frontend_url)
            .field("environment", &self.environment)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Load from environment variables (and `.env`)
    pub fn from_env() -> CommerceResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load from any key-value source, applying defaults and validation
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> CommerceResult<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| {
                CommerceError::Configuration(format!("PORT must be a port number, got '{}'", raw))
            })?,
            None => 8080,
        };

        let currency_code = get("PAYMENT_CURRENCY", "bdt");
        let currency = Currency::parse(&currency_code).ok_or_else(|| {
            CommerceError::Configuration(format!("Unsupported PAYMENT_CURRENCY: {}", currency_code))
        })?;

        let callback_secret = lookup("CALLBACK_SECRET")
            .ok_or_else(|| CommerceError::Configuration("CALLBACK_SECRET not set".to_string()))?;

        let config = Self {
            host: get("HOST", "127.0.0.1"),
            port,
            backend_url: get("BACKEND_URL", "http://localhost:8080"),
            frontend_url: get("FRONTEND_URL", "http://localhost:5173"),
            dashboard_path: get("DASHBOARD_PATH", "/dashboard/orders/"),
            environment: get("ENVIRONMENT", "development"),
            callback_secret,
            products_path: get("PRODUCTS_PATH", "config/products.toml"),
            users_path: get("USERS_PATH", "config/users.toml"),
            currency,
            default_city: get("DEFAULT_CITY", "Dhaka"),
            default_country: get("DEFAULT_COUNTRY", "Bangladesh"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CommerceResult<()> {
        for (key, url) in [
            ("BACKEND_URL", &self.backend_url),
            ("FRONTEND_URL", &self.frontend_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(CommerceError::Configuration(format!(
                    "{} must be an http(s) URL, got '{}'",
                    key, url
                )));
            }
        }
        if !self.dashboard_path.starts_with('/') {
            return Err(CommerceError::Configuration(
                "DASHBOARD_PATH must start with '/'".to_string(),
            ));
        }
        // Rejects short secrets.
        CallbackSigner::new(&self.callback_secret)?;
        self.socket_addr()?;
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> CommerceResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| {
                CommerceError::Configuration(format!(
                    "Invalid socket address {}:{}",
                    self.host, self.port
                ))
            })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Where the browser lands after any payment outcome
    pub fn dashboard_url(&self) -> String {
        format!(
            "{}{}",
            self.frontend_url.trim_end_matches('/'),
            self.dashboard_path
        )
    }

    fn checkout_defaults(&self) -> CheckoutDefaults {
        CheckoutDefaults {
            city: self.default_city.clone(),
            country: self.default_country.clone(),
            ..CheckoutDefaults::default()
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: Arc<AppConfig>,
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Bearer token directory
    pub users: Arc<UserDirectory>,
    /// Operation x role rules
    pub policy: Arc<AccessPolicy>,
    pub carts: CartService,
    pub orders: OrderService,
    pub payments: PaymentBridge,
}

impl AppState {
    /// Create the production state: env config, TOML catalog and users,
    /// SSLCommerz gateway, in-memory store.
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let catalog = load_product_catalog(&config.products_path)?;
        let users = load_user_directory(&config.users_path)?;
        let gateway = SslCommerzGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize SSLCommerz: {}", e))?;

        let state = Self::build(
            config,
            catalog,
            users,
            Arc::new(InMemoryStore::new()),
            Arc::new(gateway),
        )?;
        Ok(state)
    }

    /// Assemble state from explicit parts
    pub fn build(
        config: AppConfig,
        catalog: ProductCatalog,
        users: UserDirectory,
        store: SharedStore,
        gateway: BoxedPaymentGateway,
    ) -> CommerceResult<Self> {
        config.validate()?;
        let catalog = Arc::new(catalog);
        let signer = CallbackSigner::new(&config.callback_secret)?;

        let carts = CartService::new(store.clone(), catalog.clone());
        let orders = OrderService::new(store, catalog.clone(), config.currency);
        let payments = PaymentBridge::new(gateway, orders.clone(), signer, &config.backend_url)
            .with_defaults(config.checkout_defaults());

        Ok(Self {
            config: Arc::new(config),
            catalog,
            users: Arc::new(users),
            policy: Arc::new(AccessPolicy::standard()),
            carts,
            orders,
            payments,
        })
    }

    /// Policy check for operations open to anonymous callers
    pub fn authorize(&self, op: Operation, caller: &Caller) -> Result<(), ApiError> {
        self.policy.check(op, caller.role())?;
        Ok(())
    }

    /// Policy check for operations that need a signed-in user
    pub fn authorize_user<'a>(&self, op: Operation, caller: &'a Caller) -> Result<&'a User, ApiError> {
        self.authorize(op, caller)?;
        caller
            .user()
            .ok_or_else(|| ApiError::from(CommerceError::Unauthenticated))
    }
}

/// Load product catalog from config file
fn load_product_catalog(path: &str) -> anyhow::Result<ProductCatalog> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
            Ok(catalog)
        }
        Err(e) => {
            tracing::warn!("No product catalog at {} ({}), using empty catalog", path, e);
            Ok(ProductCatalog::new())
        }
    }
}

/// Load user directory from config file
fn load_user_directory(path: &str) -> anyhow::Result<UserDirectory> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read user directory {}: {}", path, e))?;
    let users = UserDirectory::from_toml(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
    tracing::info!("Loaded {} users from {}", users.len(), path);
    Ok(users)
}
