//! Settlement routing: two confirmation shapes, one fulfillment call.

use crate::config::PaygateConfig;
use crate::crypto::verify::verify_webhook_signature;
use crate::protocol::models::{parse_webhook_event, WebhookEvent};
use crate::settlement::fulfillment::{FulfillmentEngine, FulfillmentOutcome, Settle};
use crate::PaygateError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Inbound payment confirmation, tagged by delivery path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Checkout callback from an authenticated buyer.
    ClientConfirmation {
        /// Caller identity from the identity provider.
        user_id: String,
        /// Gateway payment id.
        payment_id: String,
        /// Gateway order id.
        order_id: String,
        /// Checkout signature.
        signature: String,
    },
    /// Signed notification pushed by the gateway.
    GatewayWebhook {
        /// Raw request body exactly as received.
        raw_payload: Vec<u8>,
        /// Signature header value.
        signature: String,
    },
}

/// Result of routing a confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The confirmation reached the fulfillment engine.
    Settled(FulfillmentOutcome),
    /// A validly signed webhook for an event that settles nothing.
    Ignored {
        /// The event name.
        event: String,
    },
}

/// Normalizes confirmations and hands them to the fulfillment engine.
pub struct SettlementRouter {
    webhook_secret: String,
    engine: Arc<FulfillmentEngine>,
}

impl SettlementRouter {
    /// Create a router in front of `engine`.
    pub fn new(config: &PaygateConfig, engine: Arc<FulfillmentEngine>) -> Self {
        Self {
            webhook_secret: config.webhook_secret.clone(),
            engine,
        }
    }

    /// Route a confirmation to the fulfillment engine.
    pub fn route(&self, confirmation: Confirmation) -> Result<SettlementOutcome, PaygateError> {
        match confirmation {
            Confirmation::ClientConfirmation {
                user_id,
                payment_id,
                order_id,
                signature,
            } => {
                require_field("paymentId", &payment_id)?;
                require_field("orderId", &order_id)?;
                require_field("signature", &signature)?;

                // Signature is checked as the engine's first step.
                let request = Settle::client(user_id, payment_id, order_id, signature);
                self.engine.settle(&request).map(SettlementOutcome::Settled)
            }
            Confirmation::GatewayWebhook {
                raw_payload,
                signature,
            } => self.route_webhook(raw_payload, signature),
        }
    }

    fn route_webhook(
        &self,
        raw_payload: Vec<u8>,
        signature: String,
    ) -> Result<SettlementOutcome, PaygateError> {
        // Nothing in an unverified body is trusted, not even its event name.
        // The engine verifies again when it settles.
        if !verify_webhook_signature(&raw_payload, &signature, &self.webhook_secret) {
            warn!(bytes = raw_payload.len(), "webhook signature rejected");
            return Err(PaygateError::SignatureInvalid);
        }

        match parse_webhook_event(&raw_payload)? {
            WebhookEvent::Ignored { event } => {
                debug!(%event, "webhook event ignored");
                Ok(SettlementOutcome::Ignored { event })
            }
            WebhookEvent::PaymentCaptured {
                payment_id,
                order_id,
                ..
            } => {
                let request = Settle::webhook(payment_id, order_id, raw_payload, signature);
                self.engine.settle(&request).map(SettlementOutcome::Settled)
            }
        }
    }
}

fn require_field(name: &str, value: &str) -> Result<(), PaygateError> {
    if value.trim().is_empty() {
        return Err(PaygateError::Validation(format!("{} is required", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::crypto::verify::sign_hmac_sha256;
    use crate::store::records::{Order, OrderStatus};
    use crate::store::{AccessStore, MemoryStore, OrderStore};
    use chrono::Utc;

    fn router_over(store: Arc<MemoryStore>) -> SettlementRouter {
        let config = PaygateConfig::new("rzp_test_key", "key-secret", "webhook-secret");
        let engine = Arc::new(FulfillmentEngine::new(
            &config,
            Arc::new(SystemClock),
            store.clone(),
            store.clone(),
            store,
        ));
        SettlementRouter::new(&config, engine)
    }

    fn seed(store: &MemoryStore) {
        store
            .insert_order(&Order {
                order_id: "order_1".to_string(),
                user_id: "user-1".to_string(),
                content_ref: "doc-1".to_string(),
                amount: 1000,
                currency: "INR".to_string(),
                status: OrderStatus::Created,
                created_at: Utc::now(),
            })
            .unwrap();
    }

    fn signed(body: &str) -> Confirmation {
        Confirmation::GatewayWebhook {
            raw_payload: body.as_bytes().to_vec(),
            signature: sign_hmac_sha256("webhook-secret", body.as_bytes()).unwrap(),
        }
    }

    #[test]
    fn test_webhook_routes_to_engine() {
        let store = Arc::new(MemoryStore::new());
        seed(&store);
        let router = router_over(store.clone());

        let outcome = router
            .route(signed(
                r#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_1","order_id":"order_1"}}}}"#,
            ))
            .unwrap();

        assert!(matches!(outcome, SettlementOutcome::Settled(_)));
        assert!(store.is_granted("user-1", "doc-1").unwrap());
    }

    #[test]
    fn test_unsigned_webhook_is_rejected_before_parsing() {
        let router = router_over(Arc::new(MemoryStore::new()));
        let result = router.route(Confirmation::GatewayWebhook {
            raw_payload: b"not even json".to_vec(),
            signature: "deadbeef".to_string(),
        });
        assert!(matches!(result, Err(PaygateError::SignatureInvalid)));
    }

    #[test]
    fn test_signed_irrelevant_event_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        seed(&store);
        let router = router_over(store.clone());

        let outcome = router
            .route(signed(r#"{"event":"refund.created","payload":{}}"#))
            .unwrap();
        assert_eq!(
            outcome,
            SettlementOutcome::Ignored {
                event: "refund.created".to_string()
            }
        );
        assert!(store.granted("user-1").unwrap().is_empty());
    }

    #[test]
    fn test_signed_malformed_webhook_is_protocol_error() {
        let router = router_over(Arc::new(MemoryStore::new()));
        let result = router.route(signed("{ truncated"));
        assert!(matches!(result, Err(PaygateError::ProtocolError(_))));
    }

    #[test]
    fn test_client_confirmation_requires_fields() {
        let router = router_over(Arc::new(MemoryStore::new()));
        let result = router.route(Confirmation::ClientConfirmation {
            user_id: "user-1".to_string(),
            payment_id: String::new(),
            order_id: "order_1".to_string(),
            signature: "abc".to_string(),
        });
        assert!(matches!(result, Err(PaygateError::Validation(_))));
    }
}
