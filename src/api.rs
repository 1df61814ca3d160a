//! Transport-neutral HTTP handlers.
//!
//! Each handler takes the pieces of a request it needs (authorization header,
//! signature header, raw body) and returns an [`ApiResponse`]. Binding these to
//! a concrete server is left to the embedding application.
//!
//! | Endpoint | Handler |
//! |---|---|
//! | `POST /create-order` | [`Api::create_order`] |
//! | `POST /settle` | [`Api::settle`] |
//! | `POST /webhook` | [`Api::webhook`] |
//! | `GET /entitlements` | [`Api::entitlements`] |

use crate::identity::{authenticate, IdentityProvider};
use crate::manager::Paygate;
use crate::settlement::{Confirmation, FulfillmentOutcome, SettlementOutcome};
use crate::PaygateError;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, warn};

/// Response produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// JSON body.
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateOrderBody {
    #[serde(default)]
    amount: Option<u64>,
    #[serde(default, rename = "contentRef")]
    content_ref: Option<String>,
}

/// Settle body, told apart by shape.
///
/// A body carrying `rawPayload` is a relayed gateway notification; one with
/// only ids and a signature is a checkout callback.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SettleMessage {
    Webhook {
        #[serde(rename = "rawPayload")]
        raw_payload: String,
        signature: String,
    },
    Client {
        #[serde(rename = "paymentId")]
        payment_id: String,
        #[serde(rename = "orderId")]
        order_id: String,
        signature: String,
    },
}

/// HTTP-facing adapter over a [`Paygate`].
pub struct Api {
    paygate: Arc<Paygate>,
    identity: Arc<dyn IdentityProvider>,
}

impl Api {
    /// Create the adapter.
    pub fn new(paygate: Arc<Paygate>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { paygate, identity }
    }

    /// `POST create-order {amount, contentRef}`.
    pub fn create_order(&self, authorization: Option<&str>, body: &[u8]) -> ApiResponse {
        let user_id = match authenticate(self.identity.as_ref(), authorization) {
            Ok(user_id) => user_id,
            Err(e) => return error_response(&e),
        };

        let parsed: CreateOrderBody = match serde_json::from_slice(body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return error_response(&PaygateError::Validation(format!(
                    "invalid request body: {}",
                    e
                )))
            }
        };

        let (Some(amount), Some(content_ref)) = (parsed.amount, parsed.content_ref) else {
            return error_response(&PaygateError::Validation(
                "amount and contentRef are required".to_string(),
            ));
        };

        match self.paygate.create_order(&user_id, amount, &content_ref) {
            Ok(created) => match serde_json::to_value(&created) {
                Ok(body) => ApiResponse::ok(body),
                Err(e) => error_response(&PaygateError::ProtocolError(e.to_string())),
            },
            Err(e) => error_response(&e),
        }
    }

    /// `POST settle`, routed on body shape.
    ///
    /// The client shape requires an authenticated caller; the relayed webhook
    /// shape is authenticated by its signature alone.
    pub fn settle(&self, authorization: Option<&str>, body: &[u8]) -> ApiResponse {
        let message: SettleMessage = match serde_json::from_slice(body) {
            Ok(message) => message,
            Err(_) => {
                return error_response(&PaygateError::Validation(
                    "body is neither a client confirmation nor a gateway notification"
                        .to_string(),
                ))
            }
        };

        match message {
            SettleMessage::Webhook {
                raw_payload,
                signature,
            } => self.webhook_confirmation(raw_payload.into_bytes(), signature),
            SettleMessage::Client {
                payment_id,
                order_id,
                signature,
            } => {
                let user_id = match authenticate(self.identity.as_ref(), authorization) {
                    Ok(user_id) => user_id,
                    Err(e) => return error_response(&e),
                };
                let result = self.paygate.settle(Confirmation::ClientConfirmation {
                    user_id,
                    payment_id,
                    order_id,
                    signature,
                });
                match result {
                    Ok(outcome) => settled_response(&outcome),
                    Err(e) => error_response(&e),
                }
            }
        }
    }

    /// `POST webhook` with the gateway's raw body and signature header.
    pub fn webhook(&self, signature: Option<&str>, body: &[u8]) -> ApiResponse {
        self.webhook_confirmation(body.to_vec(), signature.unwrap_or_default().to_string())
    }

    /// `GET entitlements`.
    pub fn entitlements(&self, authorization: Option<&str>) -> ApiResponse {
        let user_id = match authenticate(self.identity.as_ref(), authorization) {
            Ok(user_id) => user_id,
            Err(e) => return error_response(&e),
        };

        match self.paygate.entitlements(&user_id) {
            Ok(ents) => ApiResponse::ok(json!({ "contentRefs": ents.content_refs })),
            Err(e) => error_response(&e),
        }
    }

    fn webhook_confirmation(&self, raw_payload: Vec<u8>, signature: String) -> ApiResponse {
        let result = self.paygate.settle(Confirmation::GatewayWebhook {
            raw_payload,
            signature,
        });

        match result {
            Ok(outcome) => settled_response(&outcome),
            Err(e) => webhook_error_response(&e),
        }
    }
}

fn settled_response(outcome: &SettlementOutcome) -> ApiResponse {
    match outcome {
        SettlementOutcome::Settled(fulfillment) => {
            let status = match fulfillment {
                FulfillmentOutcome::Fulfilled { .. } => "fulfilled",
                FulfillmentOutcome::AlreadyFulfilled { .. } => "already_fulfilled",
            };
            ApiResponse::ok(json!({
                "status": status,
                "contentRef": fulfillment.content_ref(),
            }))
        }
        SettlementOutcome::Ignored { event } => {
            ApiResponse::ok(json!({ "status": "ignored", "event": event }))
        }
    }
}

/// Status code for an error on an authenticated, client-facing endpoint.
pub fn status_for(err: &PaygateError) -> StatusCode {
    match err {
        PaygateError::Authentication => StatusCode::UNAUTHORIZED,
        PaygateError::Validation(_) | PaygateError::SignatureInvalid => StatusCode::BAD_REQUEST,
        PaygateError::OrderNotFound { .. } => StatusCode::NOT_FOUND,
        PaygateError::UserMismatch | PaygateError::EntitlementMissing { .. } => {
            StatusCode::FORBIDDEN
        }
        PaygateError::GatewayTransport(_) | PaygateError::ProtocolError(_) => {
            StatusCode::BAD_GATEWAY
        }
        PaygateError::FulfillmentPersistence { .. }
        | PaygateError::StoreIO(_)
        | PaygateError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(err: &PaygateError) -> Value {
    json!({
        "error": err.kind(),
        "message": err.to_string(),
        "retriable": err.is_retriable(),
    })
}

fn error_response(err: &PaygateError) -> ApiResponse {
    let status = status_for(err);
    if status.is_server_error() {
        error!(error = %err, kind = err.kind(), "request failed");
    }
    ApiResponse {
        status,
        body: error_body(err),
    }
}

/// Webhooks acknowledge every business outcome so the gateway stops
/// redelivering; only infrastructure failures ask for a retry.
fn webhook_error_response(err: &PaygateError) -> ApiResponse {
    match err {
        PaygateError::FulfillmentPersistence { .. }
        | PaygateError::StoreIO(_)
        | PaygateError::ConfigError(_) => {
            error!(error = %err, "webhook settlement failed, gateway will redeliver");
            ApiResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: error_body(err),
            }
        }
        _ => {
            warn!(error = %err, kind = err.kind(), "webhook acknowledged without fulfillment");
            ApiResponse::ok(json!({
                "status": "acknowledged",
                "error": err.kind(),
            }))
        }
    }
}
