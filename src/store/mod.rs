//! Document store seams and backends.
//!
//! The fulfillment engine relies on exactly two store guarantees:
//! - [`TransactionStore::create_if_absent`] is atomic and reports an existing
//!   key distinguishably from success.
//! - [`AccessStore::grant`] only ever adds a (user, content) pair.

pub mod file;
pub mod memory;
pub mod records;

use crate::PaygateError;
use records::{CreateOutcome, Order, Transaction};
use std::collections::BTreeSet;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Durable record of purchase intent.
pub trait OrderStore: Send + Sync {
    /// Persist a new order. Fails if the order id is already recorded.
    fn insert_order(&self, order: &Order) -> Result<(), PaygateError>;

    /// Look up an order by gateway order id.
    fn get_order(&self, order_id: &str) -> Result<Option<Order>, PaygateError>;

    /// Move an order to `settled`. Idempotent; unknown ids are an error.
    fn mark_settled(&self, order_id: &str) -> Result<(), PaygateError>;
}

/// Fulfillment records keyed by payment id.
pub trait TransactionStore: Send + Sync {
    /// Atomically write `tx` unless a record with the same payment id exists.
    fn create_if_absent(&self, tx: &Transaction) -> Result<CreateOutcome, PaygateError>;

    /// Look up a transaction by payment id.
    fn get_transaction(&self, payment_id: &str) -> Result<Option<Transaction>, PaygateError>;
}

/// Per-user set of unlocked content.
pub trait AccessStore: Send + Sync {
    /// Mark (user, content) as granted. Add-only; never removes other grants.
    fn grant(&self, user_id: &str, content_ref: &str) -> Result<(), PaygateError>;

    /// Whether (user, content) is granted.
    fn is_granted(&self, user_id: &str, content_ref: &str) -> Result<bool, PaygateError>;

    /// All content granted to a user.
    fn granted(&self, user_id: &str) -> Result<BTreeSet<String>, PaygateError>;
}
