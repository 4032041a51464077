//! # SSLCommerz Sessions
//!
//! Opens hosted checkout sessions through the SSLCommerz v4 session API.
//! The shopper is redirected to `GatewayPageURL`; SSLCommerz later posts the
//! outcome to the success / fail / cancel URLs of the request.

use crate::config::SslCommerzConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shop_core::{
    CommerceError, CommerceResult, PaymentGateway, PaymentSession, PaymentSessionRequest,
};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "sslcommerz";

/// SSLCommerz hosted checkout gateway
pub struct SslCommerzGateway {
    config: SslCommerzConfig,
    client: Client,
}

impl SslCommerzGateway {
    pub fn new(config: SslCommerzConfig) -> CommerceResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CommerceError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CommerceResult<Self> {
        Self::new(SslCommerzConfig::from_env()?)
    }

    /// Form fields for the session API, in the order SSLCommerz documents them
    fn form_params(&self, request: &PaymentSessionRequest) -> Vec<(&'static str, String)> {
        let customer = &request.customer;
        let mut params = vec![
            ("store_id", self.config.store_id.clone()),
            ("store_passwd", self.config.store_password.clone()),
            ("total_amount", request.amount.decimal_string()),
            ("currency", request.amount.currency.to_string()),
            ("tran_id", request.transaction_id.clone()),
            ("success_url", request.urls.success_url.clone()),
            ("fail_url", request.urls.fail_url.clone()),
            ("cancel_url", request.urls.cancel_url.clone()),
            ("emi_option", "0".to_string()),
            ("cus_name", customer.name.clone()),
            ("cus_email", customer.email.clone()),
            ("cus_phone", customer.phone.clone()),
            ("cus_add1", customer.address.clone()),
            ("cus_city", customer.city.clone()),
            ("cus_country", customer.country.clone()),
            ("shipping_method", request.shipping_method.clone()),
            ("multi_card_name", String::new()),
            ("num_of_item", request.num_items.to_string()),
            ("product_name", request.product_name.clone()),
            ("product_category", request.product_category.clone()),
            ("product_profile", request.product_profile.clone()),
        ];

        // Any shipping method other than NO requires a shipping address.
        if !request.shipping_method.eq_ignore_ascii_case("NO") {
            params.extend([
                ("ship_name", customer.name.clone()),
                ("ship_add1", customer.address.clone()),
                ("ship_city", customer.city.clone()),
                ("ship_country", customer.country.clone()),
            ]);
        }
        params
    }
}

#[async_trait]
impl PaymentGateway for SslCommerzGateway {
    #[instrument(skip(self, request), fields(tran_id = %request.transaction_id))]
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> CommerceResult<PaymentSession> {
        let params = self.form_params(request);
        debug!(
            "Creating SSLCommerz session: amount={} {}, sandbox={}",
            request.amount.decimal_string(),
            request.amount.currency,
            self.config.sandbox
        );

        let response = self
            .client
            .post(self.config.session_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| CommerceError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CommerceError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("SSLCommerz API error: status={}, body={}", status, body);
            return Err(CommerceError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let session: SessionResponse = serde_json::from_str(&body).map_err(|e| {
            CommerceError::Serialization(format!("Failed to parse SSLCommerz response: {}", e))
        })?;

        if !session.status.eq_ignore_ascii_case("SUCCESS") {
            let reason = session
                .failed_reason
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| session.status.clone());
            error!("SSLCommerz refused session: {}", reason);
            return Err(CommerceError::ProviderError {
                provider: PROVIDER.to_string(),
                message: reason,
            });
        }

        let gateway_url = session
            .gateway_page_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CommerceError::ProviderError {
                provider: PROVIDER.to_string(),
                message: "SUCCESS without GatewayPageURL".to_string(),
            })?;

        info!("Created SSLCommerz session for {}", request.transaction_id);

        Ok(PaymentSession {
            transaction_id: request.transaction_id.clone(),
            provider: PROVIDER.to_string(),
            gateway_url,
            session_key: session.session_key,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// SSLCommerz API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct SessionResponse {
    status: String,
    #[serde(default, rename = "failedreason")]
    failed_reason: Option<String>,
    #[serde(default, rename = "sessionkey")]
    session_key: Option<String>,
    #[serde(default, rename = "GatewayPageURL")]
    gateway_page_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shop_core::{CallbackUrls, Currency, CustomerProfile, Price};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_request() -> PaymentSessionRequest {
        PaymentSessionRequest {
            transaction_id: "txn_42".to_string(),
            amount: Price::new(1250.0, Currency::BDT),
            num_items: 3,
            customer: CustomerProfile {
                name: "Alice Khan".to_string(),
                email: "alice@example.com".to_string(),
                phone: "01700000000".to_string(),
                address: "House 1".to_string(),
                city: "Dhaka".to_string(),
                country: "Bangladesh".to_string(),
            },
            urls: CallbackUrls::under("https://api.example.com", |_| "sig".to_string()),
            shipping_method: "Courier".to_string(),
            product_name: "E-commerce Products".to_string(),
            product_category: "General".to_string(),
            product_profile: "general".to_string(),
        }
    }

    fn gateway(server: &MockServer) -> SslCommerzGateway {
        let config = SslCommerzConfig::new("teststore", "teststore@ssl", true)
            .with_api_base_url(server.uri());
        SslCommerzGateway::new(config).unwrap()
    }

    #[test]
    fn test_form_params() {
        let gateway =
            SslCommerzGateway::new(SslCommerzConfig::new("teststore", "secret", true)).unwrap();
        let params = gateway.form_params(&session_request());
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("tran_id"), Some("txn_42"));
        assert_eq!(get("total_amount"), Some("1250.00"));
        assert_eq!(get("currency"), Some("BDT"));
        assert_eq!(get("num_of_item"), Some("3"));
        assert_eq!(get("ship_city"), Some("Dhaka"));
        assert_eq!(
            get("success_url"),
            Some("https://api.example.com/api/v1/payment/success/?sig=sig")
        );
    }

    #[test]
    fn test_no_shipping_skips_address() {
        let gateway =
            SslCommerzGateway::new(SslCommerzConfig::new("teststore", "secret", true)).unwrap();
        let mut request = session_request();
        request.shipping_method = "NO".to_string();
        let params = gateway.form_params(&request);
        assert!(!params.iter().any(|(k, _)| *k == "ship_name"));
    }

    #[tokio::test]
    async fn test_create_session_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gwprocess/v4/api.php"))
            .and(body_string_contains("tran_id=txn_42"))
            .and(body_string_contains("store_id=teststore"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCESS",
                "failedreason": "",
                "sessionkey": "ABC123",
                "GatewayPageURL": "https://sandbox.sslcommerz.com/EasyCheckOut/ABC123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = gateway(&server)
            .create_session(&session_request())
            .await
            .unwrap();

        assert_eq!(session.transaction_id, "txn_42");
        assert_eq!(session.provider, "sslcommerz");
        assert_eq!(
            session.gateway_url,
            "https://sandbox.sslcommerz.com/EasyCheckOut/ABC123"
        );
        assert_eq!(session.session_key.as_deref(), Some("ABC123"));
    }

    #[tokio::test]
    async fn test_create_session_failed_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gwprocess/v4/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "FAILED",
                "failedreason": "Store Credential Error Or Store is De-active"
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .create_session(&session_request())
            .await
            .unwrap_err();

        match err {
            CommerceError::ProviderError { provider, message } => {
                assert_eq!(provider, "sslcommerz");
                assert!(message.contains("Store Credential Error"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_session_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .create_session(&session_request())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_create_session_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .create_session(&session_request())
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Serialization(_)));
    }
}
