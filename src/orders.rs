//! Order creation: validate a purchase intent, mint a gateway order, record it.

use crate::client::PaymentGateway;
use crate::clock::Clock;
use crate::config::PaygateConfig;
use crate::crypto::digest::order_receipt;
use crate::protocol::models::{GatewayOrderRequest, OrderNotes};
use crate::store::records::{Order, OrderStatus};
use crate::store::OrderStore;
use crate::PaygateError;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Longest accepted content reference.
pub const MAX_CONTENT_REF_LEN: usize = 512;

/// Order handed back to the caller, ready for the gateway checkout flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    /// Gateway-issued order id.
    pub order_id: String,
    /// Amount in minor units.
    pub amount: u64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Public gateway key the frontend opens checkout with.
    pub session_token: String,
}

/// Creates and records purchase intents.
pub struct OrderService {
    config: PaygateConfig,
    clock: Arc<dyn Clock>,
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderStore>,
}

impl OrderService {
    /// Build the service from injected collaborators.
    pub fn new(
        config: PaygateConfig,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            config,
            clock,
            gateway,
            orders,
        }
    }

    /// Create an order for `user_id` to buy `content_ref` at `amount`.
    ///
    /// # Errors
    /// - `Validation` - missing user/content or amount outside configured bounds
    /// - `GatewayTransport` / `ProtocolError` - the gateway call failed
    /// - `StoreIO` - the order could not be recorded
    pub fn create_order(
        &self,
        user_id: &str,
        amount: u64,
        content_ref: &str,
    ) -> Result<CreatedOrder, PaygateError> {
        let content_ref = validate_content_ref(content_ref)?;
        if user_id.trim().is_empty() {
            return Err(PaygateError::Validation("user id is required".to_string()));
        }
        self.validate_amount(amount)?;

        let now = self.clock.now_utc();
        let request = GatewayOrderRequest {
            amount,
            currency: self.config.currency.clone(),
            receipt: order_receipt(user_id, content_ref, &now.to_rfc3339()),
            notes: OrderNotes {
                user_id: Some(user_id.to_string()),
                content_ref: Some(content_ref.to_string()),
            },
        };

        let minted = self.gateway.create_order(&request)?;
        if minted.amount != amount {
            return Err(PaygateError::ProtocolError(format!(
                "gateway order {} amount {} does not match requested {}",
                minted.id, minted.amount, amount
            )));
        }

        let order = Order {
            order_id: minted.id,
            user_id: user_id.to_string(),
            content_ref: content_ref.to_string(),
            amount,
            currency: minted.currency,
            status: OrderStatus::Created,
            created_at: now,
        };
        self.orders.insert_order(&order)?;

        info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            content_ref = %order.content_ref,
            amount = order.amount,
            "order created"
        );

        Ok(CreatedOrder {
            order_id: order.order_id,
            amount: order.amount,
            currency: order.currency,
            session_token: self.config.key_id.clone(),
        })
    }

    fn validate_amount(&self, amount: u64) -> Result<(), PaygateError> {
        if amount < self.config.min_amount || amount > self.config.max_amount {
            return Err(PaygateError::Validation(format!(
                "amount {} outside {}..={}",
                amount, self.config.min_amount, self.config.max_amount
            )));
        }
        Ok(())
    }
}

/// Trim and check a content reference.
pub fn validate_content_ref(content_ref: &str) -> Result<&str, PaygateError> {
    let trimmed = content_ref.trim();
    if trimmed.is_empty() {
        return Err(PaygateError::Validation(
            "content reference is required".to_string(),
        ));
    }
    if trimmed.len() > MAX_CONTENT_REF_LEN {
        return Err(PaygateError::Validation(format!(
            "content reference longer than {} bytes",
            MAX_CONTENT_REF_LEN
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(PaygateError::Validation(
            "content reference contains control characters".to_string(),
        ));
    }
    Ok(trimmed)
}
