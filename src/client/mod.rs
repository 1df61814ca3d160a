//! Payment gateway client layer.

pub mod http;

use crate::protocol::models::{GatewayOrder, GatewayOrderRequest};
use crate::PaygateError;

pub use http::GatewayClient;

/// Gateway operations the core depends on.
///
/// Implemented by [`GatewayClient`]; tests substitute their own.
pub trait PaymentGateway: Send + Sync {
    /// Mint a gateway order for the given amount and metadata.
    fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, PaygateError>;
}
