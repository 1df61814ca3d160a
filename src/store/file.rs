//! File-based document store with atomic create-if-absent.
//!
//! Layout under the store root:
//!
//! ```text
//! orders/<sha256(order_id)>.json
//! transactions/<sha256(payment_id)>.json
//! access/<sha256(user_id)>/<sha256(content_ref)>.json
//! ```
//!
//! New documents are written to a `NamedTempFile` in the target directory and
//! persisted with `persist_noclobber`, which refuses to replace an existing
//! path. Concurrent writers in any number of processes see exactly one
//! `Created` per key and readers never observe a half-written document.
//! Order status updates use `persist`, which renames over the old document.

use crate::crypto::digest::document_key;
use crate::store::records::{
    from_json, to_json, CreateOutcome, GrantRecord, Order, OrderStatus, Transaction,
};
use crate::store::{AccessStore, OrderStore, TransactionStore};
use crate::PaygateError;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const ORDERS_DIR: &str = "orders";
const TRANSACTIONS_DIR: &str = "transactions";
const ACCESS_DIR: &str = "access";

/// File-based store backend.
#[derive(Debug)]
pub struct FileStore {
    /// Root directory for all documents.
    root: PathBuf,
}

impl FileStore {
    /// Create a file store with the given namespace.
    ///
    /// Documents are stored under `dirs::data_dir()/<namespace>/`.
    pub fn new(namespace: &str) -> Result<Self, PaygateError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| PaygateError::StoreIO("Could not find data directory".to_string()))?;

        Self::with_path(base_dir.join(namespace))
    }

    /// Create a file store rooted at a specific path.
    pub fn with_path(root: PathBuf) -> Result<Self, PaygateError> {
        for dir in [ORDERS_DIR, TRANSACTIONS_DIR, ACCESS_DIR] {
            fs::create_dir_all(root.join(dir)).map_err(|e| {
                PaygateError::StoreIO(format!("Failed to create store dir: {}", e))
            })?;
        }
        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn order_path(&self, order_id: &str) -> PathBuf {
        self.root
            .join(ORDERS_DIR)
            .join(format!("{}.json", document_key(order_id)))
    }

    fn transaction_path(&self, payment_id: &str) -> PathBuf {
        self.root
            .join(TRANSACTIONS_DIR)
            .join(format!("{}.json", document_key(payment_id)))
    }

    fn user_access_dir(&self, user_id: &str) -> PathBuf {
        self.root.join(ACCESS_DIR).join(document_key(user_id))
    }

    fn grant_path(&self, user_id: &str, content_ref: &str) -> PathBuf {
        self.user_access_dir(user_id)
            .join(format!("{}.json", document_key(content_ref)))
    }
}

/// Write `json` to a fresh temp file next to `target`.
///
/// `NamedTempFile` opens with `O_EXCL` under a random name, so writers in
/// different processes never share a temp path. The file is removed if it is
/// dropped without being persisted.
fn write_temp(target: &Path, json: &str) -> Result<NamedTempFile, PaygateError> {
    let dir = target
        .parent()
        .ok_or_else(|| PaygateError::StoreIO("document path has no parent".to_string()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| PaygateError::StoreIO(format!("Failed to create temp file: {}", e)))?;
    temp.write_all(json.as_bytes())
        .map_err(|e| PaygateError::StoreIO(format!("Failed to write temp file: {}", e)))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| PaygateError::StoreIO(format!("Failed to sync temp file: {}", e)))?;
    Ok(temp)
}

/// Write `json` to `target` only if nothing exists there yet.
fn create_document(target: &Path, json: &str) -> Result<CreateOutcome, PaygateError> {
    let temp = write_temp(target, json)?;

    match temp.persist_noclobber(target) {
        Ok(_) => Ok(CreateOutcome::Created),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(CreateOutcome::AlreadyExists),
        Err(e) => Err(PaygateError::StoreIO(format!(
            "Failed to persist document: {}",
            e.error
        ))),
    }
}

/// Replace the document at `target` atomically.
fn replace_document(target: &Path, json: &str) -> Result<(), PaygateError> {
    write_temp(target, json)?
        .persist(target)
        .map(|_| ())
        .map_err(|e| PaygateError::StoreIO(format!("Failed to replace document: {}", e.error)))
}

/// Read a document, mapping a missing file to `None`.
fn read_document(path: &Path) -> Result<Option<String>, PaygateError> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(Some(json)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PaygateError::StoreIO(format!(
            "Failed to read document: {}",
            e
        ))),
    }
}

impl OrderStore for FileStore {
    fn insert_order(&self, order: &Order) -> Result<(), PaygateError> {
        let json = to_json(order)?;
        match create_document(&self.order_path(&order.order_id), &json)? {
            CreateOutcome::Created => Ok(()),
            CreateOutcome::AlreadyExists => Err(PaygateError::StoreIO(format!(
                "order {} already recorded",
                order.order_id
            ))),
        }
    }

    fn get_order(&self, order_id: &str) -> Result<Option<Order>, PaygateError> {
        read_document(&self.order_path(order_id))?
            .map(|json| from_json(&json))
            .transpose()
    }

    fn mark_settled(&self, order_id: &str) -> Result<(), PaygateError> {
        let path = self.order_path(order_id);
        let mut order: Order = match read_document(&path)? {
            Some(json) => from_json(&json)?,
            None => {
                return Err(PaygateError::StoreIO(format!(
                    "order {} not recorded",
                    order_id
                )))
            }
        };

        if order.status == OrderStatus::Settled {
            return Ok(());
        }

        order.status = OrderStatus::Settled;
        replace_document(&path, &to_json(&order)?)
    }
}

impl TransactionStore for FileStore {
    fn create_if_absent(&self, tx: &Transaction) -> Result<CreateOutcome, PaygateError> {
        let json = to_json(tx)?;
        create_document(&self.transaction_path(&tx.payment_id), &json)
    }

    fn get_transaction(&self, payment_id: &str) -> Result<Option<Transaction>, PaygateError> {
        read_document(&self.transaction_path(payment_id))?
            .map(|json| from_json(&json))
            .transpose()
    }
}

impl AccessStore for FileStore {
    fn grant(&self, user_id: &str, content_ref: &str) -> Result<(), PaygateError> {
        fs::create_dir_all(self.user_access_dir(user_id))
            .map_err(|e| PaygateError::StoreIO(format!("Failed to create access dir: {}", e)))?;

        let record = GrantRecord {
            user_id: user_id.to_string(),
            content_ref: content_ref.to_string(),
            granted: true,
        };

        // An existing grant document is the same grant.
        create_document(&self.grant_path(user_id, content_ref), &to_json(&record)?)?;
        Ok(())
    }

    fn is_granted(&self, user_id: &str, content_ref: &str) -> Result<bool, PaygateError> {
        match read_document(&self.grant_path(user_id, content_ref))? {
            Some(json) => Ok(from_json::<GrantRecord>(&json)?.granted),
            None => Ok(false),
        }
    }

    fn granted(&self, user_id: &str) -> Result<BTreeSet<String>, PaygateError> {
        let dir = self.user_access_dir(user_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => {
                return Err(PaygateError::StoreIO(format!(
                    "Failed to read access dir: {}",
                    e
                )))
            }
        };

        let mut granted = BTreeSet::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| PaygateError::StoreIO(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Some(json) = read_document(&path)? {
                let record: GrantRecord = from_json(&json)?;
                if record.granted {
                    granted.insert(record.content_ref);
                }
            }
        }
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Barrier;
    use tempfile::TempDir;

    fn make_order(id: &str, user: &str) -> Order {
        Order {
            order_id: id.to_string(),
            user_id: user.to_string(),
            content_ref: "doc-1".to_string(),
            amount: 1500,
            currency: "INR".to_string(),
            status: OrderStatus::Created,
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    /// Count `.json` documents and anything else (temp files) in `dir`.
    fn json_and_stray_files(dir: &Path) -> (usize, usize) {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .fold((0, 0), |(json, stray), path| {
                if path.extension().is_some_and(|ext| ext == "json") {
                    (json + 1, stray)
                } else {
                    (json, stray + 1)
                }
            })
    }

    #[test]
    fn test_order_roundtrip_and_settle() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let order = make_order("order_1", "user-1");

        store.insert_order(&order).unwrap();
        assert_eq!(store.get_order("order_1").unwrap(), Some(order.clone()));

        store.mark_settled("order_1").unwrap();
        let loaded = store.get_order("order_1").unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Settled);
        assert_eq!(loaded.amount, order.amount);
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();

        store.insert_order(&make_order("order_1", "user-1")).unwrap();
        let result = store.insert_order(&make_order("order_1", "user-2"));
        assert!(matches!(result, Err(PaygateError::StoreIO(_))));
        assert_eq!(
            store.get_order("order_1").unwrap().unwrap().user_id,
            "user-1"
        );
    }

    #[test]
    fn test_mark_settled_unknown_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        assert!(store.mark_settled("order_missing").is_err());
    }

    #[test]
    fn test_transaction_create_if_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let tx = Transaction::verified_for("pay_1", &make_order("order_1", "user-1"), Utc::now());

        assert_eq!(store.create_if_absent(&tx).unwrap(), CreateOutcome::Created);
        assert_eq!(
            store.create_if_absent(&tx).unwrap(),
            CreateOutcome::AlreadyExists
        );
        assert_eq!(store.get_transaction("pay_1").unwrap(), Some(tx));
        assert!(store.get_transaction("pay_2").unwrap().is_none());
    }

    #[test]
    fn test_transaction_race_has_single_winner() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let order = make_order("order_1", "user-1");
        let barrier = Barrier::new(6);
        let (store, order, barrier) = (&store, &order, &barrier);

        let created = std::thread::scope(|s| {
            let handles: Vec<_> = (0..6)
                .map(|_| {
                    s.spawn(move || {
                        let tx = Transaction::verified_for("pay_race", order, Utc::now());
                        barrier.wait();
                        store.create_if_absent(&tx).unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|o| *o == CreateOutcome::Created)
                .count()
        });

        assert_eq!(created, 1);
        assert_eq!(json_and_stray_files(&temp_dir.path().join(TRANSACTIONS_DIR)), (1, 0));
    }

    #[test]
    fn test_separate_instances_share_one_winner() {
        let temp_dir = TempDir::new().unwrap();
        let stores: Vec<FileStore> = (0..4)
            .map(|_| FileStore::with_path(temp_dir.path().to_path_buf()).unwrap())
            .collect();
        let order = make_order("order_1", "user-1");
        let barrier = Barrier::new(stores.len());
        let (order, barrier) = (&order, &barrier);

        let outcomes: Vec<CreateOutcome> = std::thread::scope(|s| {
            let handles: Vec<_> = stores
                .iter()
                .map(|store| {
                    s.spawn(move || {
                        let tx = Transaction::verified_for("pay_shared", order, Utc::now());
                        barrier.wait();
                        store.create_if_absent(&tx)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        let created = outcomes
            .iter()
            .filter(|o| **o == CreateOutcome::Created)
            .count();
        assert_eq!(created, 1);
        assert_eq!(json_and_stray_files(&temp_dir.path().join(TRANSACTIONS_DIR)), (1, 0));
    }

    #[test]
    fn test_rejected_create_cleans_up_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let tx = Transaction::verified_for("pay_1", &make_order("order_1", "user-1"), Utc::now());

        store.create_if_absent(&tx).unwrap();
        for _ in 0..3 {
            assert_eq!(
                store.create_if_absent(&tx).unwrap(),
                CreateOutcome::AlreadyExists
            );
        }
        store.insert_order(&make_order("order_1", "user-1")).unwrap();
        store.mark_settled("order_1").unwrap();

        assert_eq!(json_and_stray_files(&temp_dir.path().join(TRANSACTIONS_DIR)), (1, 0));
        assert_eq!(json_and_stray_files(&temp_dir.path().join(ORDERS_DIR)), (1, 0));
    }

    #[test]
    fn test_grants_merge_without_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();

        assert!(store.granted("user-1").unwrap().is_empty());

        store.grant("user-1", "doc-1").unwrap();
        store.grant("user-1", "doc/with/slashes.pdf").unwrap();
        store.grant("user-1", "doc-1").unwrap();
        store.grant("user-2", "doc-3").unwrap();

        let granted = store.granted("user-1").unwrap();
        let expected: BTreeSet<String> = ["doc-1", "doc/with/slashes.pdf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(granted, expected);
        assert!(store.is_granted("user-2", "doc-3").unwrap());
        assert!(!store.is_granted("user-2", "doc-1").unwrap());
    }

    #[test]
    fn test_documents_persist_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
            store.insert_order(&make_order("order_1", "user-1")).unwrap();
            store.grant("user-1", "doc-1").unwrap();
        }

        let store = FileStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        assert!(store.get_order("order_1").unwrap().is_some());
        assert!(store.is_granted("user-1", "doc-1").unwrap());
    }
}
