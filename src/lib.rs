//! # Paygate
//!
//! **Idempotent order creation and payment fulfillment for paid content.**
//!
//! Paygate creates orders against a Razorpay-style payment gateway and turns
//! confirmed payments into content entitlements. A payment may be confirmed by
//! the buyer's checkout callback, by a signed gateway webhook, or by both in
//! any order; every confirmation funnels into one fulfillment routine keyed by
//! the gateway payment id, so access is granted exactly once.
//!
//! ## Features
//!
//! - **HMAC-SHA256 verification** for checkout callbacks and webhooks
//! - **Atomic create-if-absent** transaction record as the only lock
//! - **Self-healing retries**: a verified payment whose grant failed is
//!   repaired on the next delivery of the same payment
//! - **Add-only entitlements** stored one document per grant
//!
//! ## Quickstart
//!
//! ```no_run
//! use paygate::{Paygate, PaygateConfig};
//!
//! fn main() -> Result<(), paygate::PaygateError> {
//!     let config = PaygateConfig::new("rzp_test_key", "key-secret", "webhook-secret");
//!     let paygate = Paygate::new(config)?;
//!
//!     let order = paygate.create_order("user-1", 1000, "articles/42")?;
//!     println!("checkout order {}", order.order_id);
//!
//!     // later, from the checkout callback
//!     paygate.settle_client("user-1", "pay_123", &order.order_id, "hex-signature")?;
//!     assert!(paygate.has_access("user-1", "articles/42")?);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! - `key_id` / `key_secret`: gateway API credentials; the secret also signs
//!   checkout callbacks
//! - `webhook_secret`: signs gateway webhook bodies
//! - `min_amount` / `max_amount`: accepted order range in minor units
//!
//! See [`PaygateConfig`] for full documentation.

#![warn(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// Persistence layer
pub mod store;

// Services
pub mod access;
pub mod identity;
pub mod orders;
pub mod settlement;

// Facade and transport adapter
pub mod api;
pub mod manager;

// Re-exports for public API
pub use access::{AccessQuery, Entitlements};
pub use api::{Api, ApiResponse};
pub use client::{GatewayClient, PaymentGateway};
pub use clock::{Clock, SystemClock};
pub use config::PaygateConfig;
pub use errors::PaygateError;
pub use identity::{IdentityProvider, StaticIdentity};
pub use manager::{Collaborators, Paygate};
pub use orders::CreatedOrder;
pub use settlement::{
    Confirmation, FulfillmentEngine, FulfillmentOutcome, Settle, SettlementOutcome,
    SettlementRouter,
};
pub use store::{AccessStore, FileStore, MemoryStore, OrderStore, TransactionStore};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
