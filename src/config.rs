//! Paygate configuration.

use crate::PaygateError;
use std::fmt;
use std::time::Duration;

/// Default lower bound for an order amount, in minor currency units.
pub const DEFAULT_MIN_AMOUNT: u64 = 500;

/// Default upper bound for an order amount, in minor currency units.
pub const DEFAULT_MAX_AMOUNT: u64 = 5000;

/// Configuration for order creation and settlement.
///
/// Secrets are redacted from the `Debug` representation.
#[derive(Clone)]
pub struct PaygateConfig {
    /// Gateway key id. Public; handed to the frontend as the checkout session key.
    pub key_id: String,

    /// Gateway key secret. Authenticates order creation and keys client payment signatures.
    pub key_secret: String,

    /// Secret keying the gateway's webhook signatures. Must differ from `key_secret`.
    pub webhook_secret: String,

    /// ISO 4217 currency code for new orders.
    pub currency: String,

    /// Smallest accepted order amount (inclusive, minor units).
    pub min_amount: u64,

    /// Largest accepted order amount (inclusive, minor units).
    pub max_amount: u64,

    /// Gateway API host (e.g., "api.razorpay.com").
    pub gateway_host: String,

    /// Namespace for the file store under the platform data directory.
    pub store_namespace: String,

    /// Timeout for gateway HTTP requests.
    pub request_timeout: Duration,
}

impl PaygateConfig {
    /// Create a configuration with default bounds, currency and host.
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
            currency: "INR".to_string(),
            min_amount: DEFAULT_MIN_AMOUNT,
            max_amount: DEFAULT_MAX_AMOUNT,
            gateway_host: "api.razorpay.com".to_string(),
            store_namespace: "paygate".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Load configuration from `PAYGATE_*` environment variables.
    ///
    /// `PAYGATE_KEY_ID`, `PAYGATE_KEY_SECRET` and `PAYGATE_WEBHOOK_SECRET` are
    /// required. `PAYGATE_CURRENCY`, `PAYGATE_MIN_AMOUNT`, `PAYGATE_MAX_AMOUNT`,
    /// `PAYGATE_GATEWAY_HOST` and `PAYGATE_STORE_NAMESPACE` override defaults.
    pub fn from_env() -> Result<Self, PaygateError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from a variable lookup, as [`from_env`](Self::from_env)
    /// does with the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PaygateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| PaygateError::ConfigError(format!("{} is not set", name)))
        };
        let amount = |name: &str| -> Result<Option<u64>, PaygateError> {
            lookup(name)
                .map(|raw| {
                    raw.trim().parse::<u64>().map_err(|e| {
                        PaygateError::ConfigError(format!("{} is not a number: {}", name, e))
                    })
                })
                .transpose()
        };

        let mut config = Self::new(
            required("PAYGATE_KEY_ID")?,
            required("PAYGATE_KEY_SECRET")?,
            required("PAYGATE_WEBHOOK_SECRET")?,
        );

        if let Some(currency) = lookup("PAYGATE_CURRENCY") {
            config.currency = currency;
        }
        if let Some(host) = lookup("PAYGATE_GATEWAY_HOST") {
            config.gateway_host = host;
        }
        if let Some(namespace) = lookup("PAYGATE_STORE_NAMESPACE") {
            config.store_namespace = namespace;
        }
        if let Some(min) = amount("PAYGATE_MIN_AMOUNT")? {
            config.min_amount = min;
        }
        if let Some(max) = amount("PAYGATE_MAX_AMOUNT")? {
            config.max_amount = max;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), PaygateError> {
        if self.key_id.is_empty() {
            return Err(PaygateError::ConfigError(
                "key_id cannot be empty".to_string(),
            ));
        }
        if self.key_secret.is_empty() {
            return Err(PaygateError::ConfigError(
                "key_secret cannot be empty".to_string(),
            ));
        }
        if self.webhook_secret.is_empty() {
            return Err(PaygateError::ConfigError(
                "webhook_secret cannot be empty".to_string(),
            ));
        }
        if self.webhook_secret == self.key_secret {
            return Err(PaygateError::ConfigError(
                "webhook_secret must differ from key_secret".to_string(),
            ));
        }
        if self.currency.len() != 3 {
            return Err(PaygateError::ConfigError(format!(
                "currency must be a 3-letter code, got {:?}",
                self.currency
            )));
        }
        if self.min_amount == 0 || self.min_amount > self.max_amount {
            return Err(PaygateError::ConfigError(format!(
                "invalid amount bounds {}..={}",
                self.min_amount, self.max_amount
            )));
        }
        if self.store_namespace.is_empty() {
            return Err(PaygateError::ConfigError(
                "store_namespace cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for PaygateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaygateConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("currency", &self.currency)
            .field("min_amount", &self.min_amount)
            .field("max_amount", &self.max_amount)
            .field("gateway_host", &self.gateway_host)
            .field("store_namespace", &self.store_namespace)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name: &str| vars.get(name).map(|v| v.to_string())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("PAYGATE_KEY_ID", "rzp_test_key"),
        ("PAYGATE_KEY_SECRET", "key-secret"),
        ("PAYGATE_WEBHOOK_SECRET", "webhook-secret"),
    ];

    #[test]
    fn test_lookup_requires_credentials() {
        let result = PaygateConfig::from_lookup(lookup_from(&REQUIRED[..2]));
        assert!(matches!(
            result,
            Err(PaygateError::ConfigError(msg)) if msg.contains("PAYGATE_WEBHOOK_SECRET")
        ));
    }

    #[test]
    fn test_lookup_defaults_and_overrides() {
        let config = PaygateConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.min_amount, DEFAULT_MIN_AMOUNT);
        assert_eq!(config.currency, "INR");

        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("PAYGATE_MIN_AMOUNT", " 100 "),
            ("PAYGATE_MAX_AMOUNT", "900"),
            ("PAYGATE_CURRENCY", "USD"),
            ("PAYGATE_STORE_NAMESPACE", "paygate-test"),
        ]);
        let config = PaygateConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!((config.min_amount, config.max_amount), (100, 900));
        assert_eq!(config.currency, "USD");
        assert_eq!(config.store_namespace, "paygate-test");
    }

    #[test]
    fn test_lookup_rejects_non_numeric_amount() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PAYGATE_MAX_AMOUNT", "lots"));
        let result = PaygateConfig::from_lookup(lookup_from(&vars));
        assert!(matches!(
            result,
            Err(PaygateError::ConfigError(msg)) if msg.contains("PAYGATE_MAX_AMOUNT")
        ));
    }

    #[test]
    fn test_lookup_rejects_inverted_bounds() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([("PAYGATE_MIN_AMOUNT", "5000"), ("PAYGATE_MAX_AMOUNT", "500")]);
        let result = PaygateConfig::from_lookup(lookup_from(&vars));
        assert!(matches!(result, Err(PaygateError::ConfigError(_))));
    }

    fn test_config() -> PaygateConfig {
        PaygateConfig::new("rzp_test_key", "key-secret", "webhook-secret")
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = test_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_amount, 500);
        assert_eq!(config.max_amount, 5000);
    }

    #[test]
    fn test_rejects_shared_secret() {
        let config = PaygateConfig::new("rzp_test_key", "same", "same");
        assert!(matches!(config.validate(), Err(PaygateError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut config = test_config();
        config.min_amount = 6000;
        assert!(matches!(config.validate(), Err(PaygateError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_empty_key_id() {
        let mut config = test_config();
        config.key_id = String::new();
        assert!(matches!(config.validate(), Err(PaygateError::ConfigError(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("key-secret"));
        assert!(!rendered.contains("webhook-secret"));
        assert!(rendered.contains("rzp_test_key"));
    }
}
