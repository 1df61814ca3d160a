//! Idempotent fulfillment: one verified payment, one access grant.
//!
//! The only synchronization point is
//! [`TransactionStore::create_if_absent`](crate::store::TransactionStore::create_if_absent)
//! on the payment id. Whoever creates the transaction grants access; everyone
//! else lands on the already-exists branch, which re-checks the entitlement and
//! repairs it if an earlier attempt died between the two writes.

use crate::clock::Clock;
use crate::config::PaygateConfig;
use crate::crypto::verify::{verify_payment_signature, verify_webhook_signature};
use crate::protocol::models::{parse_webhook_event, WebhookEvent};
use crate::store::records::{CreateOutcome, Order, OrderStatus, Transaction};
use crate::store::{AccessStore, OrderStore, TransactionStore};
use crate::PaygateError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which delivery path a settlement arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Synchronous callback from the buyer's checkout.
    Client,
    /// Asynchronous gateway notification.
    Webhook,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Client => f.write_str("client"),
            Channel::Webhook => f.write_str("webhook"),
        }
    }
}

/// Evidence that the gateway confirmed a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementProof {
    /// Checkout signature over `order_id|payment_id`, submitted by an authenticated user.
    Client {
        /// Verified identity of the caller.
        user_id: String,
        /// Hex HMAC-SHA256 keyed with the gateway key secret.
        signature: String,
    },
    /// Signed webhook body.
    Webhook {
        /// Raw request body exactly as received.
        raw_payload: Vec<u8>,
        /// Hex HMAC-SHA256 of the body keyed with the webhook secret.
        signature: String,
    },
}

/// Normalized settlement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settle {
    /// Gateway payment id; the idempotency key.
    pub payment_id: String,
    /// Gateway order id the payment claims to settle.
    pub order_id: String,
    /// Signature evidence.
    pub proof: SettlementProof,
}

impl Settle {
    /// Settlement submitted by an authenticated client.
    pub fn client(
        user_id: impl Into<String>,
        payment_id: impl Into<String>,
        order_id: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            payment_id: payment_id.into(),
            order_id: order_id.into(),
            proof: SettlementProof::Client {
                user_id: user_id.into(),
                signature: signature.into(),
            },
        }
    }

    /// Settlement pushed by the gateway.
    pub fn webhook(
        payment_id: impl Into<String>,
        order_id: impl Into<String>,
        raw_payload: Vec<u8>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            payment_id: payment_id.into(),
            order_id: order_id.into(),
            proof: SettlementProof::Webhook {
                raw_payload,
                signature: signature.into(),
            },
        }
    }

    /// Caller identity, present only on the client path.
    pub fn source_user_id(&self) -> Option<&str> {
        match &self.proof {
            SettlementProof::Client { user_id, .. } => Some(user_id),
            SettlementProof::Webhook { .. } => None,
        }
    }

    /// Delivery path of this settlement.
    pub fn channel(&self) -> Channel {
        match self.proof {
            SettlementProof::Client { .. } => Channel::Client,
            SettlementProof::Webhook { .. } => Channel::Webhook,
        }
    }
}

/// Successful result of a settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// This call created the transaction and granted access.
    Fulfilled {
        /// Settled payment.
        payment_id: String,
        /// User granted access.
        user_id: String,
        /// Content unlocked.
        content_ref: String,
    },
    /// The payment had already been fulfilled; nothing new was recorded.
    AlreadyFulfilled {
        /// Settled payment.
        payment_id: String,
        /// User holding access.
        user_id: String,
        /// Content unlocked.
        content_ref: String,
        /// Whether this call had to re-grant a missing entitlement.
        entitlement_repaired: bool,
    },
}

impl FulfillmentOutcome {
    /// User the payment is bound to.
    pub fn user_id(&self) -> &str {
        match self {
            Self::Fulfilled { user_id, .. } | Self::AlreadyFulfilled { user_id, .. } => user_id,
        }
    }

    /// Content the payment unlocked.
    pub fn content_ref(&self) -> &str {
        match self {
            Self::Fulfilled { content_ref, .. } | Self::AlreadyFulfilled { content_ref, .. } => {
                content_ref
            }
        }
    }

    /// Whether the payment had been fulfilled before this call.
    pub fn was_already_fulfilled(&self) -> bool {
        matches!(self, Self::AlreadyFulfilled { .. })
    }
}

/// Turns verified payments into access grants, exactly once per payment id.
pub struct FulfillmentEngine {
    key_secret: String,
    webhook_secret: String,
    clock: Arc<dyn Clock>,
    orders: Arc<dyn OrderStore>,
    transactions: Arc<dyn TransactionStore>,
    access: Arc<dyn AccessStore>,
}

impl FulfillmentEngine {
    /// Build the engine from injected stores.
    pub fn new(
        config: &PaygateConfig,
        clock: Arc<dyn Clock>,
        orders: Arc<dyn OrderStore>,
        transactions: Arc<dyn TransactionStore>,
        access: Arc<dyn AccessStore>,
    ) -> Self {
        Self {
            key_secret: config.key_secret.clone(),
            webhook_secret: config.webhook_secret.clone(),
            clock,
            orders,
            transactions,
            access,
        }
    }

    /// Settle a payment.
    ///
    /// Steps:
    /// 1. Verify the proof
    /// 2. Load the order
    /// 3. On the client path, require the caller to own the order
    /// 4. Create the transaction if absent
    /// 5. Grant access (always on creation; on an existing transaction only
    ///    if the grant is not yet visible)
    ///
    /// # Errors
    /// - `SignatureInvalid` - proof does not verify; nothing written
    /// - `OrderNotFound` - unknown order id; nothing written
    /// - `UserMismatch` - client does not own the order; nothing written
    /// - `FulfillmentPersistence` - verified, but a write failed; retry is safe
    /// - `StoreIO` - the order could not be read
    pub fn settle(&self, request: &Settle) -> Result<FulfillmentOutcome, PaygateError> {
        let channel = request.channel();

        if !self.verify_proof(request) {
            warn!(
                payment_id = %request.payment_id,
                order_id = %request.order_id,
                %channel,
                "payment signature rejected"
            );
            return Err(PaygateError::SignatureInvalid);
        }

        let order = self
            .orders
            .get_order(&request.order_id)?
            .ok_or_else(|| PaygateError::OrderNotFound {
                order_id: request.order_id.clone(),
            })?;

        if let Some(caller) = request.source_user_id() {
            if caller != order.user_id {
                warn!(
                    payment_id = %request.payment_id,
                    order_id = %order.order_id,
                    caller,
                    "settlement attempted for another user's order"
                );
                return Err(PaygateError::UserMismatch);
            }
        }

        let tx = Transaction::verified_for(&request.payment_id, &order, self.clock.now_utc());
        let created = self
            .transactions
            .create_if_absent(&tx)
            .map_err(|e| self.persistence_failure(&tx.payment_id, e))?;

        match created {
            CreateOutcome::Created => {
                self.grant(&tx)?;
                self.settle_order(&order, &tx.payment_id)?;

                info!(
                    payment_id = %tx.payment_id,
                    order_id = %tx.order_id,
                    user_id = %tx.user_id,
                    content_ref = %tx.content_ref,
                    %channel,
                    "payment fulfilled"
                );
                Ok(FulfillmentOutcome::Fulfilled {
                    payment_id: tx.payment_id,
                    user_id: tx.user_id,
                    content_ref: tx.content_ref,
                })
            }
            CreateOutcome::AlreadyExists => self.reconcile_existing(&order, &tx, channel),
        }
    }

    /// Re-check a payment whose transaction already exists.
    fn reconcile_existing(
        &self,
        order: &Order,
        attempted: &Transaction,
        channel: Channel,
    ) -> Result<FulfillmentOutcome, PaygateError> {
        let payment_id = &attempted.payment_id;
        let existing = self
            .transactions
            .get_transaction(payment_id)
            .map_err(|e| self.persistence_failure(payment_id, e))?
            .ok_or_else(|| {
                self.persistence_failure(
                    payment_id,
                    PaygateError::StoreIO("transaction reported present but not readable".into()),
                )
            })?;

        if existing.order_id != attempted.order_id {
            warn!(
                payment_id = %payment_id,
                recorded_order = %existing.order_id,
                claimed_order = %attempted.order_id,
                "payment already bound to a different order"
            );
        }

        let granted = self
            .access
            .is_granted(&existing.user_id, &existing.content_ref)
            .map_err(|e| self.persistence_failure(payment_id, e))?;

        if !granted {
            self.grant(&existing)?;
            info!(
                payment_id = %payment_id,
                user_id = %existing.user_id,
                content_ref = %existing.content_ref,
                %channel,
                "entitlement repaired for fulfilled payment"
            );
        } else {
            debug!(payment_id = %payment_id, %channel, "payment already fulfilled");
        }

        if existing.order_id == order.order_id {
            self.settle_order(order, payment_id)?;
        }

        Ok(FulfillmentOutcome::AlreadyFulfilled {
            payment_id: existing.payment_id,
            user_id: existing.user_id,
            content_ref: existing.content_ref,
            entitlement_repaired: !granted,
        })
    }

    fn verify_proof(&self, request: &Settle) -> bool {
        match &request.proof {
            SettlementProof::Client { signature, .. } => verify_payment_signature(
                &request.order_id,
                &request.payment_id,
                signature,
                &self.key_secret,
            ),
            SettlementProof::Webhook {
                raw_payload,
                signature,
            } => {
                if !verify_webhook_signature(raw_payload, signature, &self.webhook_secret) {
                    return false;
                }
                // `settle` is public: the signed body must name the same
                // payment and order.
                matches!(
                    parse_webhook_event(raw_payload),
                    Ok(WebhookEvent::PaymentCaptured { ref payment_id, ref order_id, .. })
                        if *payment_id == request.payment_id && *order_id == request.order_id
                )
            }
        }
    }

    fn grant(&self, tx: &Transaction) -> Result<(), PaygateError> {
        self.access
            .grant(&tx.user_id, &tx.content_ref)
            .map_err(|e| self.persistence_failure(&tx.payment_id, e))
    }

    fn settle_order(&self, order: &Order, payment_id: &str) -> Result<(), PaygateError> {
        if order.status == OrderStatus::Settled {
            return Ok(());
        }
        self.orders
            .mark_settled(&order.order_id)
            .map_err(|e| self.persistence_failure(payment_id, e))
    }

    fn persistence_failure(&self, payment_id: &str, source: PaygateError) -> PaygateError {
        error!(payment_id, error = %source, "payment verified but fulfillment not persisted");
        PaygateError::persistence(payment_id, source)
    }
}
