//! Durable document formats: orders, transactions and grants.

use crate::PaygateError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Intent recorded, no payment settled yet.
    Created,
    /// A verified payment has been fulfilled against this order.
    Settled,
}

/// Purchase intent, keyed by the gateway-issued order id.
///
/// Immutable except for `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Gateway-issued order id.
    pub order_id: String,
    /// User the order is bound to.
    pub user_id: String,
    /// Canonical reference of the content being purchased.
    pub content_ref: String,
    /// Amount in minor units.
    pub amount: u64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Current status.
    pub status: OrderStatus,
    /// When the order was recorded.
    pub created_at: DateTime<Utc>,
}

/// Fulfillment record, keyed by payment id. Written at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Gateway payment id; the idempotency key.
    pub payment_id: String,
    /// Order the payment settled.
    pub order_id: String,
    /// User the grant is bound to.
    pub user_id: String,
    /// Content the grant unlocks.
    pub content_ref: String,
    /// Whether the payment signature was verified.
    pub verified: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build the verified transaction for a payment against an order.
    pub fn verified_for(payment_id: &str, order: &Order, created_at: DateTime<Utc>) -> Self {
        Self {
            payment_id: payment_id.to_string(),
            order_id: order.order_id.clone(),
            user_id: order.user_id.clone(),
            content_ref: order.content_ref.clone(),
            verified: true,
            created_at,
        }
    }
}

/// One granted (user, content) pair as stored by document backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    /// User holding the entitlement.
    pub user_id: String,
    /// Unlocked content.
    pub content_ref: String,
    /// Always true; present so the document mirrors `contentRef → granted`.
    pub granted: bool,
}

/// Result of an atomic create-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The document did not exist and was written.
    Created,
    /// A document with the same key already existed; nothing was written.
    AlreadyExists,
}

/// Serialize a stored document to JSON.
pub fn to_json<T: Serialize>(doc: &T) -> Result<String, PaygateError> {
    serde_json::to_string_pretty(doc)
        .map_err(|e| PaygateError::StoreIO(format!("Failed to serialize document: {}", e)))
}

/// Deserialize a stored document from JSON.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, PaygateError> {
    serde_json::from_str(json)
        .map_err(|e| PaygateError::StoreIO(format!("Failed to deserialize document: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_order() -> Order {
        Order {
            order_id: "order_1".to_string(),
            user_id: "user-1".to_string(),
            content_ref: "doc-42".to_string(),
            amount: 1000,
            currency: "INR".to_string(),
            status: OrderStatus::Created,
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = to_json(&sample_order()).unwrap();
        assert!(json.contains(r#""status": "created""#));
    }

    #[test]
    fn test_transaction_binds_order_user_and_content() {
        let order = sample_order();
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 12, 5, 0).unwrap();
        let tx = Transaction::verified_for("pay_1", &order, at);

        assert_eq!(tx.payment_id, "pay_1");
        assert_eq!(tx.order_id, "order_1");
        assert_eq!(tx.user_id, "user-1");
        assert_eq!(tx.content_ref, "doc-42");
        assert!(tx.verified);
        assert_eq!(tx.created_at, at);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result: Result<Order, _> = from_json("{ not json");
        assert!(matches!(result, Err(PaygateError::StoreIO(_))));
    }
}
