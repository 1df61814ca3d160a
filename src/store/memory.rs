//! In-process store backend.
//!
//! Suitable for a single process and for tests. Each map sits behind its own
//! lock and no lock is held across calls.

use crate::store::records::{CreateOutcome, Order, OrderStatus, Transaction};
use crate::store::{AccessStore, OrderStore, TransactionStore};
use crate::PaygateError;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory implementation of every store seam.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<String, Order>>,
    transactions: RwLock<HashMap<String, Transaction>>,
    access: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded transactions.
    pub fn transaction_count(&self) -> Result<usize, PaygateError> {
        Ok(read(&self.transactions)?.len())
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, PaygateError> {
    lock.read()
        .map_err(|_| PaygateError::StoreIO("memory store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, PaygateError> {
    lock.write()
        .map_err(|_| PaygateError::StoreIO("memory store lock poisoned".to_string()))
}

impl OrderStore for MemoryStore {
    fn insert_order(&self, order: &Order) -> Result<(), PaygateError> {
        match write(&self.orders)?.entry(order.order_id.clone()) {
            Entry::Occupied(_) => Err(PaygateError::StoreIO(format!(
                "order {} already recorded",
                order.order_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                Ok(())
            }
        }
    }

    fn get_order(&self, order_id: &str) -> Result<Option<Order>, PaygateError> {
        Ok(read(&self.orders)?.get(order_id).cloned())
    }

    fn mark_settled(&self, order_id: &str) -> Result<(), PaygateError> {
        let mut orders = write(&self.orders)?;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| PaygateError::StoreIO(format!("order {} not recorded", order_id)))?;
        order.status = OrderStatus::Settled;
        Ok(())
    }
}

impl TransactionStore for MemoryStore {
    fn create_if_absent(&self, tx: &Transaction) -> Result<CreateOutcome, PaygateError> {
        match write(&self.transactions)?.entry(tx.payment_id.clone()) {
            Entry::Occupied(_) => Ok(CreateOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(tx.clone());
                Ok(CreateOutcome::Created)
            }
        }
    }

    fn get_transaction(&self, payment_id: &str) -> Result<Option<Transaction>, PaygateError> {
        Ok(read(&self.transactions)?.get(payment_id).cloned())
    }
}

impl AccessStore for MemoryStore {
    fn grant(&self, user_id: &str, content_ref: &str) -> Result<(), PaygateError> {
        write(&self.access)?
            .entry(user_id.to_string())
            .or_default()
            .insert(content_ref.to_string());
        Ok(())
    }

    fn is_granted(&self, user_id: &str, content_ref: &str) -> Result<bool, PaygateError> {
        Ok(read(&self.access)?
            .get(user_id)
            .is_some_and(|set| set.contains(content_ref)))
    }

    fn granted(&self, user_id: &str) -> Result<BTreeSet<String>, PaygateError> {
        Ok(read(&self.access)?
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
