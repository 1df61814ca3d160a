//! Paygate error types.

use thiserror::Error;

/// Errors that can occur while creating orders or settling payments.
#[derive(Debug, Error)]
pub enum PaygateError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Identity token is missing or was rejected by the identity provider.
    #[error("Authentication required")]
    Authentication,

    /// Order parameters are missing or out of range.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Payment or webhook signature did not match.
    #[error("Payment signature verification failed")]
    SignatureInvalid,

    /// No order exists for the given order id.
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The order id that was looked up.
        order_id: String,
    },

    /// Caller is not the user the order is bound to.
    #[error("Order belongs to a different user")]
    UserMismatch,

    /// User has not unlocked the requested content.
    #[error("No entitlement for content: {content_ref}")]
    EntitlementMissing {
        /// The content that was requested.
        content_ref: String,
    },

    /// Payment was verified but the grant could not be persisted.
    ///
    /// Retrying the same settlement is safe and will complete the grant.
    #[error("Payment {payment_id} confirmed, access pending: {reason}")]
    FulfillmentPersistence {
        /// Payment id whose fulfillment is pending.
        payment_id: String,
        /// Underlying store failure.
        reason: String,
    },

    /// HTTP transport error communicating with the payment gateway.
    #[error("Gateway transport error: {0}")]
    GatewayTransport(String),

    /// Gateway or client payload could not be parsed.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Document store I/O error.
    #[error("Store I/O error: {0}")]
    StoreIO(String),
}

impl PaygateError {
    /// Stable machine-readable code for API bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "config_error",
            Self::Authentication => "authentication_error",
            Self::Validation(_) => "validation_error",
            Self::SignatureInvalid => "signature_invalid",
            Self::OrderNotFound { .. } => "order_not_found",
            Self::UserMismatch => "user_mismatch",
            Self::EntitlementMissing { .. } => "entitlement_missing",
            Self::FulfillmentPersistence { .. } => "fulfillment_pending",
            Self::GatewayTransport(_) => "gateway_transport",
            Self::ProtocolError(_) => "protocol_error",
            Self::StoreIO(_) => "store_io",
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::FulfillmentPersistence { .. } | Self::GatewayTransport(_) | Self::StoreIO(_)
        )
    }

    pub(crate) fn persistence(payment_id: &str, source: PaygateError) -> Self {
        Self::FulfillmentPersistence {
            payment_id: payment_id.to_string(),
            reason: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_error_is_retriable_and_distinct() {
        let err = PaygateError::persistence("pay_1", PaygateError::StoreIO("disk full".into()));
        assert!(err.is_retriable());
        assert_eq!(err.kind(), "fulfillment_pending");
        assert!(err.to_string().contains("pay_1"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn business_errors_are_not_retriable() {
        assert!(!PaygateError::SignatureInvalid.is_retriable());
        assert!(!PaygateError::UserMismatch.is_retriable());
        assert!(!PaygateError::OrderNotFound {
            order_id: "order_1".into()
        }
        .is_retriable());
    }
}
