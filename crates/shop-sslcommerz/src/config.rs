//! # SSLCommerz Configuration
//!
//! Store credentials and endpoint selection.
//! All secrets are loaded from environment variables.

use shop_core::CommerceError;
use std::env;

pub const SANDBOX_BASE_URL: &str = "https://sandbox.sslcommerz.com";
pub const LIVE_BASE_URL: &str = "https://securepay.sslcommerz.com";

/// SSLCommerz store configuration
#[derive(Clone)]
pub struct SslCommerzConfig {
    /// Store ID issued by SSLCommerz
    pub store_id: String,

    /// Store password (API secret)
    pub store_password: String,

    /// Sandbox or live endpoints
    pub sandbox: bool,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl std::fmt::Debug for SslCommerzConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SslCommerzConfig")
            .field("store_id", &self.store_id)
            .field("store_password", &"***")
            .field("sandbox", &self.sandbox)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl SslCommerzConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SSLCOMMERZ_STORE_ID`
    /// - `SSLCOMMERZ_STORE_PASSWORD`
    ///
    /// Optional:
    /// - `SSLCOMMERZ_SANDBOX` (default `true`)
    /// - `SSLCOMMERZ_API_BASE_URL` (overrides the sandbox/live endpoint)
    pub fn from_env() -> Result<Self, CommerceError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_id = required("SSLCOMMERZ_STORE_ID")?;
        let store_password = required("SSLCOMMERZ_STORE_PASSWORD")?;

        let sandbox = match env::var("SSLCOMMERZ_SANDBOX") {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| {
                CommerceError::Configuration(format!(
                    "SSLCOMMERZ_SANDBOX must be true or false, got '{}'",
                    raw
                ))
            })?,
            Err(_) => true,
        };

        let mut config = Self::new(store_id, store_password, sandbox);
        if let Ok(url) = env::var("SSLCOMMERZ_API_BASE_URL") {
            config = config.with_api_base_url(url);
        }
        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        store_id: impl Into<String>,
        store_password: impl Into<String>,
        sandbox: bool,
    ) -> Self {
        let api_base_url = if sandbox {
            SANDBOX_BASE_URL
        } else {
            LIVE_BASE_URL
        };
        Self {
            store_id: store_id.into(),
            store_password: store_password.into(),
            sandbox,
            api_base_url: api_base_url.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.store_id.trim().is_empty() {
            return Err(CommerceError::Configuration(
                "SSLCOMMERZ_STORE_ID must not be empty".to_string(),
            ));
        }
        if self.store_password.trim().is_empty() {
            return Err(CommerceError::Configuration(
                "SSLCOMMERZ_STORE_PASSWORD must not be empty".to_string(),
            ));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(CommerceError::Configuration(format!(
                "SSLCommerz API base URL must be http(s): {}",
                self.api_base_url
            )));
        }
        Ok(())
    }

    /// Session initiation endpoint
    pub fn session_url(&self) -> String {
        format!(
            "{}/gwprocess/v4/api.php",
            self.api_base_url.trim_end_matches('/')
        )
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

fn required(key: &str) -> Result<String, CommerceError> {
    env::var(key).map_err(|_| CommerceError::Configuration(format!("{} not set", key)))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
