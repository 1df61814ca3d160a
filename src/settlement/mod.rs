//! Settlement: routing inbound payment confirmations into idempotent fulfillment.
//!
//! ```text
//! client callback ──┐
//!                   ├─► SettlementRouter ─► FulfillmentEngine ─► Transaction (create-if-absent)
//! gateway webhook ──┘                                        └─► Entitlement (add-only)
//! ```

pub mod fulfillment;
pub mod router;

pub use fulfillment::{Channel, FulfillmentEngine, FulfillmentOutcome, Settle, SettlementProof};
pub use router::{Confirmation, SettlementOutcome, SettlementRouter};
