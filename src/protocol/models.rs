//! Gateway wire structs and webhook event extraction.

use crate::PaygateError;
use serde::{Deserialize, Serialize};

/// Webhook event that confirms a captured payment.
pub const EVENT_PAYMENT_CAPTURED: &str = "payment.captured";

/// Webhook event emitted when an order is fully paid; carries the payment entity.
pub const EVENT_ORDER_PAID: &str = "order.paid";

/// Order-creation request body sent to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
    /// Amount in minor units.
    pub amount: u64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Merchant-side receipt reference.
    pub receipt: String,
    /// Metadata echoed back on the order and its payments.
    pub notes: OrderNotes,
}

/// Metadata attached to a gateway order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderNotes {
    /// User the order was created for.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Content the order unlocks.
    #[serde(default)]
    pub content_ref: Option<String>,
}

/// Order as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    /// Gateway-issued order id.
    pub id: String,
    /// Amount in minor units.
    pub amount: u64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Gateway-side order status (e.g., "created").
    #[serde(default)]
    pub status: Option<String>,
}

/// Raw webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    /// Event name, e.g. `payment.captured`.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub payload: Option<WebhookPayload>,
}

/// Webhook payload entities.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Payment entity, present on payment and order events.
    #[serde(default)]
    pub payment: Option<EntityWrapper<PaymentEntity>>,
}

/// Gateway wraps each entity in `{ "entity": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityWrapper<T> {
    /// The wrapped entity.
    pub entity: T,
}

/// Payment entity inside a webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    /// Gateway payment id.
    pub id: String,
    /// Order this payment settles.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Captured amount in minor units.
    #[serde(default)]
    pub amount: Option<u64>,
    /// ISO 4217 currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Payment status (e.g., "captured").
    #[serde(default)]
    pub status: Option<String>,
}

/// Normalized meaning of a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A payment was captured for an order.
    PaymentCaptured {
        /// Gateway payment id.
        payment_id: String,
        /// Gateway order id.
        order_id: String,
        /// Captured amount, when reported.
        amount: Option<u64>,
    },
    /// An event that does not settle anything.
    Ignored {
        /// The event name.
        event: String,
    },
}

impl WebhookEvent {
    /// Extract the settlement-relevant part of a webhook envelope.
    pub fn from_envelope(envelope: &WebhookEnvelope) -> Result<Self, PaygateError> {
        if envelope.event != EVENT_PAYMENT_CAPTURED && envelope.event != EVENT_ORDER_PAID {
            return Ok(Self::Ignored {
                event: envelope.event.clone(),
            });
        }

        let payment = envelope
            .payload
            .as_ref()
            .and_then(|p| p.payment.as_ref())
            .map(|w| &w.entity)
            .ok_or_else(|| {
                PaygateError::ProtocolError(format!(
                    "{} event without payment entity",
                    envelope.event
                ))
            })?;

        let order_id = payment.order_id.clone().ok_or_else(|| {
            PaygateError::ProtocolError(format!("payment {} has no order_id", payment.id))
        })?;

        Ok(Self::PaymentCaptured {
            payment_id: payment.id.clone(),
            order_id,
            amount: payment.amount,
        })
    }
}

/// Parse a raw webhook body into a normalized event.
pub fn parse_webhook_event(body: &[u8]) -> Result<WebhookEvent, PaygateError> {
    let envelope: WebhookEnvelope = serde_json::from_slice(body).map_err(|e| {
        PaygateError::ProtocolError(format!("Failed to parse webhook payload: {}", e))
    })?;
    WebhookEvent::from_envelope(&envelope)
}

/// Parse a gateway order-creation response body.
pub fn parse_gateway_order(body: &[u8]) -> Result<GatewayOrder, PaygateError> {
    serde_json::from_slice(body).map_err(|e| {
        PaygateError::ProtocolError(format!("Failed to parse gateway order: {}", e))
    })
}
