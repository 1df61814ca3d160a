//! Paygate - the main public API.
//!
//! `Paygate` wires the order service, settlement router, fulfillment engine
//! and access query over one set of injected collaborators:
//! - Order creation against the payment gateway
//! - Settlement from either confirmation path
//! - Entitlement lookup

use crate::access::{AccessQuery, Entitlements};
use crate::client::{GatewayClient, PaymentGateway};
use crate::clock::{Clock, SystemClock};
use crate::config::PaygateConfig;
use crate::orders::{CreatedOrder, OrderService};
use crate::settlement::{Confirmation, FulfillmentEngine, SettlementOutcome, SettlementRouter};
use crate::store::{AccessStore, FileStore, OrderStore, TransactionStore};
use crate::PaygateError;
use std::sync::Arc;
use tracing::info;

/// Collaborators a [`Paygate`] runs on.
pub struct Collaborators {
    /// Time source for record stamps.
    pub clock: Arc<dyn Clock>,
    /// Payment gateway client.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Order store.
    pub orders: Arc<dyn OrderStore>,
    /// Transaction store.
    pub transactions: Arc<dyn TransactionStore>,
    /// Access store.
    pub access: Arc<dyn AccessStore>,
}

/// Payment order and fulfillment service.
///
/// Create one instance per process and share it (it is `Send + Sync`).
pub struct Paygate {
    config: PaygateConfig,
    orders: OrderService,
    router: SettlementRouter,
    query: AccessQuery,
}

impl Paygate {
    /// Create a service backed by the HTTP gateway client and the file store.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - HTTP client creation fails
    /// - Store directory creation fails
    pub fn new(config: PaygateConfig) -> Result<Self, PaygateError> {
        config.validate()?;

        let gateway = Arc::new(GatewayClient::new(&config)?);
        let store = Arc::new(FileStore::new(&config.store_namespace)?);
        info!(root = %store.root().display(), "file store opened");

        Self::with_collaborators(
            config,
            Collaborators {
                clock: Arc::new(SystemClock),
                gateway,
                orders: store.clone(),
                transactions: store.clone(),
                access: store,
            },
        )
    }

    /// Create a service over explicitly supplied collaborators.
    pub fn with_collaborators(
        config: PaygateConfig,
        parts: Collaborators,
    ) -> Result<Self, PaygateError> {
        config.validate()?;

        let engine = Arc::new(FulfillmentEngine::new(
            &config,
            parts.clock.clone(),
            parts.orders.clone(),
            parts.transactions,
            parts.access.clone(),
        ));

        Ok(Self {
            orders: OrderService::new(config.clone(), parts.clock, parts.gateway, parts.orders),
            router: SettlementRouter::new(&config, engine),
            query: AccessQuery::new(parts.access),
            config,
        })
    }

    /// Create an order for an authenticated user.
    pub fn create_order(
        &self,
        user_id: &str,
        amount: u64,
        content_ref: &str,
    ) -> Result<CreatedOrder, PaygateError> {
        self.orders.create_order(user_id, amount, content_ref)
    }

    /// Settle a tagged confirmation.
    pub fn settle(&self, confirmation: Confirmation) -> Result<SettlementOutcome, PaygateError> {
        self.router.route(confirmation)
    }

    /// Settle a checkout callback from an authenticated user.
    pub fn settle_client(
        &self,
        user_id: &str,
        payment_id: &str,
        order_id: &str,
        signature: &str,
    ) -> Result<SettlementOutcome, PaygateError> {
        self.settle(Confirmation::ClientConfirmation {
            user_id: user_id.to_string(),
            payment_id: payment_id.to_string(),
            order_id: order_id.to_string(),
            signature: signature.to_string(),
        })
    }

    /// Settle a gateway webhook delivery.
    pub fn settle_webhook(
        &self,
        raw_payload: &[u8],
        signature: &str,
    ) -> Result<SettlementOutcome, PaygateError> {
        self.settle(Confirmation::GatewayWebhook {
            raw_payload: raw_payload.to_vec(),
            signature: signature.to_string(),
        })
    }

    /// Content unlocked for a user.
    pub fn entitlements(&self, user_id: &str) -> Result<Entitlements, PaygateError> {
        self.query.entitlements(user_id)
    }

    /// Whether a user may read a piece of content.
    pub fn has_access(&self, user_id: &str, content_ref: &str) -> Result<bool, PaygateError> {
        self.query.has_access(user_id, content_ref)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &PaygateConfig {
        &self.config
    }
}
