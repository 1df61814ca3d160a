//! Reqwest-based HTTP client for the payment gateway's orders API.

use crate::client::PaymentGateway;
use crate::config::PaygateConfig;
use crate::protocol::models::{parse_gateway_order, GatewayOrder, GatewayOrderRequest};
use crate::PaygateError;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use tracing::debug;

/// Maximum number of body bytes quoted in transport errors.
const ERROR_BODY_EXCERPT: usize = 256;

/// Gateway HTTP client.
pub struct GatewayClient {
    client: Client,
    authorization: String,
    user_agent: String,
    base_url: String,
}

impl GatewayClient {
    /// Create a new gateway client from config.
    pub fn new(config: &PaygateConfig) -> Result<Self, PaygateError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaygateError::GatewayTransport(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            authorization: basic_authorization(&config.key_id, &config.key_secret),
            user_agent: build_user_agent(),
            base_url: format!("https://{}", config.gateway_host),
        })
    }

    /// Point the client at a different base URL (e.g., a local mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl PaymentGateway for GatewayClient {
    fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, PaygateError> {
        let url = format!("{}/v1/orders", self.base_url);

        let body_bytes = serde_json::to_vec(request)
            .map_err(|e| PaygateError::ProtocolError(format!("Failed to serialize: {}", e)))?;

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.authorization)
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body_bytes)
            .send()
            .map_err(|e| PaygateError::GatewayTransport(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .map_err(|e| PaygateError::GatewayTransport(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(PaygateError::GatewayTransport(format!(
                "Gateway returned {}: {}",
                status.as_u16(),
                body_excerpt(&body)
            )));
        }

        let order = parse_gateway_order(&body)?;
        debug!(order_id = %order.id, amount = order.amount, "gateway order created");
        Ok(order)
    }
}

/// Build an HTTP Basic `Authorization` header value.
pub fn basic_authorization(key_id: &str, key_secret: &str) -> String {
    let credentials = format!("{}:{}", key_id, key_secret);
    format!("Basic {}", STANDARD.encode(credentials))
}

/// Build the User-Agent string, `paygate/<version>`.
pub fn build_user_agent() -> String {
    format!("paygate/{}", env!("CARGO_PKG_VERSION"))
}

fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    text.chars().take(ERROR_BODY_EXCERPT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PaygateConfig {
        PaygateConfig::new("rzp_test_key", "key-secret", "webhook-secret")
    }

    #[test]
    fn test_basic_authorization() {
        // base64("rzp_test_key:key-secret")
        assert_eq!(
            basic_authorization("rzp_test_key", "key-secret"),
            "Basic cnpwX3Rlc3Rfa2V5OmtleS1zZWNyZXQ="
        );
    }

    #[test]
    fn test_build_user_agent() {
        let ua = build_user_agent();
        assert_eq!(ua, format!("paygate/{}", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_body_excerpt_truncates() {
        let long = vec![b'x'; 1000];
        assert_eq!(body_excerpt(&long).len(), ERROR_BODY_EXCERPT);
        assert_eq!(body_excerpt(b"short"), "short");
    }

    #[test]
    fn test_client_creation() {
        let client = GatewayClient::new(&test_config()).unwrap();
        assert_eq!(client.base_url(), "https://api.razorpay.com");
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let client = GatewayClient::new(&test_config())
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
    }

    #[test]
    fn test_unreachable_gateway_is_transport_error() {
        let client = GatewayClient::new(&test_config())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let request = GatewayOrderRequest {
            amount: 1000,
            currency: "INR".to_string(),
            receipt: "rcpt_test".to_string(),
            notes: Default::default(),
        };
        let result = client.create_order(&request);
        assert!(matches!(result, Err(PaygateError::GatewayTransport(_))));
    }
}
