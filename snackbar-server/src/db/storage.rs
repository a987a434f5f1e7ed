//! redb-based storage for orders and refunds
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Order documents |
//! | `order_numbers` | `order_number` | `order_id` | Unique number index, max key = last number |
//! | `refunds` | `refund_id` | `Refund` (JSON) | Refund records (immutable) |
//!
//! # Atomicity
//!
//! redb write transactions are exclusive. Number allocation ("read max, add
//! one, insert") and refund clamping ("read order + prior refunds, write new
//! records") each run inside a single write transaction, so concurrent
//! callers are serialized. Returning `Err` from a mutation closure drops the
//! transaction, which aborts it and leaves the tables untouched.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::models::{Order, Refund};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Order number index: key = order_number, value = order_id
const ORDER_NUMBERS_TABLE: TableDefinition<u64, i64> = TableDefinition::new("order_numbers");

/// Refunds: key = refund_id, value = JSON-serialized Refund
const REFUNDS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("refunds");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order number {0} already taken")]
    DuplicateOrderNumber(u64),

    #[error("Order index points at missing order: number={0}, id={1}")]
    DanglingIndex(u64, i64),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order/refund storage backed by redb
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the data survives a power cut.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init_tables(db)
    }

    /// Open an in-memory database (tests, ephemeral runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init_tables(db)
    }

    fn init_tables(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
            let _ = write_txn.open_table(REFUNDS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Cheap read used by the health check
    pub fn ping(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ORDERS_TABLE)?;
        Ok(())
    }

    // ========== Orders ==========

    /// Allocate the next order number and a fresh id, build the order and
    /// insert it, all in one write transaction.
    ///
    /// Next number = max existing + 1 (1 for an empty store).
    pub fn create_order<F>(&self, build: F) -> StorageResult<Order>
    where
        F: FnOnce(i64, u64) -> Order,
    {
        let txn = self.db.begin_write()?;
        let order = {
            let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
            let mut orders = txn.open_table(ORDERS_TABLE)?;

            let last = numbers.last()?.map(|(k, _)| k.value()).unwrap_or(0);
            let number = last + 1;
            if numbers.get(number)?.is_some() {
                return Err(StorageError::DuplicateOrderNumber(number));
            }

            let mut id = shared::util::snowflake_id();
            while orders.get(id)?.is_some() {
                id = shared::util::snowflake_id();
            }

            let order = build(id, number);
            let value = serde_json::to_vec(&order)?;
            orders.insert(order.id, value.as_slice())?;
            numbers.insert(order.order_number, order.id)?;
            order
        };
        txn.commit()?;
        Ok(order)
    }

    /// Get an order by id
    pub fn get_order(&self, id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by its order number
    pub fn find_order_by_number(&self, number: u64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let numbers = read_txn.open_table(ORDER_NUMBERS_TABLE)?;
        let Some(id) = numbers.get(number)?.map(|g| g.value()) else {
            return Ok(None);
        };
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        match orders.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Err(StorageError::DanglingIndex(number, id)),
        }
    }

    /// All orders, unordered
    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    /// Read-modify-write one order inside a write transaction.
    ///
    /// Returns `Ok(None)` if the order does not exist. If `mutate` fails the
    /// transaction is aborted and the stored order is unchanged.
    pub fn update_order<F, E>(&self, id: i64, mutate: F) -> Result<Option<Order>, E>
    where
        F: FnOnce(&mut Order) -> Result<(), E>,
        E: From<StorageError>,
    {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let updated = {
            let mut table = txn.open_table(ORDERS_TABLE).map_err(StorageError::from)?;
            // guard 必须在 insert 之前释放
            let mut order: Order = {
                let Some(current) = table.get(id).map_err(StorageError::from)? else {
                    return Ok(None);
                };
                serde_json::from_slice(current.value()).map_err(StorageError::from)?
            };

            mutate(&mut order)?;

            let value = serde_json::to_vec(&order).map_err(StorageError::from)?;
            table
                .insert(id, value.as_slice())
                .map_err(StorageError::from)?;
            order
        };
        txn.commit().map_err(StorageError::from)?;
        Ok(Some(updated))
    }

    /// Purge every order and the number index; returns how many were removed
    pub fn delete_all_orders(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let count = txn.open_table(ORDERS_TABLE)?.len()?;
        txn.delete_table(ORDERS_TABLE)?;
        txn.delete_table(ORDER_NUMBERS_TABLE)?;
        let _ = txn.open_table(ORDERS_TABLE)?;
        let _ = txn.open_table(ORDER_NUMBERS_TABLE)?;
        txn.commit()?;
        Ok(count)
    }

    // ========== Refunds ==========

    /// Build and insert refund records for one order inside a write
    /// transaction.
    ///
    /// `build` receives the order and every refund already recorded against
    /// its current lifetime (see [`Refund::belongs_to`]), and returns the new
    /// records. Returns `Ok(None)` if the order number
    /// does not exist.
    pub fn insert_refunds<F, E>(&self, order_number: u64, build: F) -> Result<Option<Vec<Refund>>, E>
    where
        F: FnOnce(&Order, &[Refund]) -> Result<Vec<Refund>, E>,
        E: From<StorageError>,
    {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let Some(order) = Self::order_by_number_txn(&txn, order_number)? else {
            return Ok(None);
        };

        let created = {
            let mut table = txn.open_table(REFUNDS_TABLE).map_err(StorageError::from)?;

            let mut prior: Vec<Refund> = Vec::new();
            for result in table.iter().map_err(StorageError::from)? {
                let (_key, value) = result.map_err(StorageError::from)?;
                let refund: Refund =
                    serde_json::from_slice(value.value()).map_err(StorageError::from)?;
                if refund.belongs_to(&order) {
                    prior.push(refund);
                }
            }

            let mut created = build(&order, &prior)?;
            for refund in &mut created {
                while table.get(refund.id).map_err(StorageError::from)?.is_some() {
                    refund.id = shared::util::snowflake_id();
                }
                let value = serde_json::to_vec(&*refund).map_err(StorageError::from)?;
                table
                    .insert(refund.id, value.as_slice())
                    .map_err(StorageError::from)?;
            }
            created
        };
        txn.commit().map_err(StorageError::from)?;
        Ok(Some(created))
    }

    fn order_by_number_txn(txn: &WriteTransaction, number: u64) -> StorageResult<Option<Order>> {
        let numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
        let Some(id) = numbers.get(number)?.map(|g| g.value()) else {
            return Ok(None);
        };
        let orders = txn.open_table(ORDERS_TABLE)?;
        let order = match orders.get(id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Err(StorageError::DanglingIndex(number, id)),
        };
        Ok(Some(order))
    }

    /// All refunds, unordered
    pub fn list_refunds(&self) -> StorageResult<Vec<Refund>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REFUNDS_TABLE)?;

        let mut refunds = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            refunds.push(serde_json::from_slice(value.value())?);
        }
        Ok(refunds)
    }

    /// Refunds recorded against one order number
    pub fn list_refunds_for_order(&self, order_number: u64) -> StorageResult<Vec<Refund>> {
        Ok(self
            .list_refunds()?
            .into_iter()
            .filter(|r| r.order_number == order_number)
            .collect())
    }

    /// Refunds recorded against `order` since it was created
    pub fn list_refunds_of(&self, order: &Order) -> StorageResult<Vec<Refund>> {
        Ok(self
            .list_refunds()?
            .into_iter()
            .filter(|r| r.belongs_to(order))
            .collect())
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let numbers = read_txn.open_table(ORDER_NUMBERS_TABLE)?;
        let refunds = read_txn.open_table(REFUNDS_TABLE)?;

        Ok(StorageStats {
            order_count: orders.len()?,
            refund_count: refunds.len()?,
            last_order_number: numbers.last()?.map(|(k, _)| k.value()).unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub order_count: u64,
    pub refund_count: u64,
    pub last_order_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderItem, OrderStatus};

    fn build(id: i64, number: u64) -> Order {
        Order {
            id,
            order_number: number,
            categories: vec!["Hot Beverages".into()],
            items: vec![OrderItem {
                name: "Tea".into(),
                category: "Hot Beverages".into(),
                qty: 2,
                unit_price: 30.0,
                add_ons: vec![],
            }],
            total_amount: 60.0,
            status: OrderStatus::Pending,
            is_employee_order: false,
            created_at: 1,
            updated_at: 1,
            delivered_at: None,
        }
    }

    #[test]
    fn test_order_numbers_start_at_one_and_increase() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.create_order(build).unwrap();
        let b = storage.create_order(build).unwrap();
        assert_eq!(a.order_number, 1);
        assert_eq!(b.order_number, 2);
        assert_ne!(a.id, b.id);

        let found = storage.find_order_by_number(2).unwrap().unwrap();
        assert_eq!(found.id, b.id);
        assert!(storage.find_order_by_number(3).unwrap().is_none());
    }

    #[test]
    fn test_get_and_list() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.create_order(build).unwrap();
        assert_eq!(storage.get_order(a.id).unwrap(), Some(a.clone()));
        assert!(storage.get_order(a.id + 1).unwrap().is_none());
        assert_eq!(storage.list_orders().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_update_leaves_order_untouched() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.create_order(build).unwrap();

        let result: Result<Option<Order>, StorageError> = storage.update_order(a.id, |o| {
            o.total_amount = 999.0;
            Err(StorageError::DuplicateOrderNumber(0))
        });
        assert!(result.is_err());
        assert_eq!(storage.get_order(a.id).unwrap().unwrap().total_amount, 60.0);

        let updated: Option<Order> = storage
            .update_order::<_, StorageError>(a.id, |o| {
                o.status = OrderStatus::Confirmed;
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.unwrap().status, OrderStatus::Confirmed);
        assert_eq!(
            storage.get_order(a.id).unwrap().unwrap().status,
            OrderStatus::Confirmed
        );

        let missing = storage
            .update_order::<_, StorageError>(-1, |_| Ok(()))
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_delete_all_resets_numbering() {
        let storage = Storage::open_in_memory().unwrap();
        storage.create_order(build).unwrap();
        storage.create_order(build).unwrap();

        assert_eq!(storage.delete_all_orders().unwrap(), 2);
        assert!(storage.list_orders().unwrap().is_empty());
        assert_eq!(storage.create_order(build).unwrap().order_number, 1);
    }

    #[test]
    fn test_refunds_see_prior_records() {
        let storage = Storage::open_in_memory().unwrap();
        let order = storage.create_order(build).unwrap();

        let refund = |order: &Order, prior: &[Refund]| -> Result<Vec<Refund>, StorageError> {
            Ok(vec![Refund {
                id: shared::util::snowflake_id(),
                order_number: order.order_number,
                refunded_items: order.items.clone(),
                refund_amount: prior.len() as f64,
                created_at: 1,
            }])
        };

        let first = storage.insert_refunds(1, refund).unwrap().unwrap();
        assert_eq!(first[0].refund_amount, 0.0);
        let second = storage.insert_refunds(1, refund).unwrap().unwrap();
        assert_eq!(second[0].refund_amount, 1.0);

        assert!(storage.insert_refunds(42, refund).unwrap().is_none());
        assert_eq!(storage.list_refunds_for_order(order.order_number).unwrap().len(), 2);

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.order_count, 1);
        assert_eq!(stats.refund_count, 2);
        assert_eq!(stats.last_order_number, 1);
    }

    #[test]
    fn test_purged_order_refunds_do_not_carry_over() {
        let storage = Storage::open_in_memory().unwrap();
        storage.create_order(build).unwrap();

        let refund = |order: &Order, prior: &[Refund]| -> Result<Vec<Refund>, StorageError> {
            Ok(vec![Refund {
                id: shared::util::snowflake_id(),
                order_number: order.order_number,
                refunded_items: order.items.clone(),
                refund_amount: prior.len() as f64,
                created_at: order.created_at,
            }])
        };
        storage.insert_refunds(1, refund).unwrap().unwrap();
        storage.delete_all_orders().unwrap();

        let fresh = storage
            .create_order(|id, number| Order {
                created_at: 5,
                updated_at: 5,
                ..build(id, number)
            })
            .unwrap();
        assert_eq!(fresh.order_number, 1);
        assert!(storage.list_refunds_of(&fresh).unwrap().is_empty());

        let created = storage.insert_refunds(1, refund).unwrap().unwrap();
        assert_eq!(created[0].refund_amount, 0.0);
        assert_eq!(storage.list_refunds_of(&fresh).unwrap().len(), 1);
        // 历史记录仍按单号可查
        assert_eq!(storage.list_refunds_for_order(1).unwrap().len(), 2);
    }

    #[test]
    fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snackbar.redb");
        let id = {
            let storage = Storage::open(&path).unwrap();
            storage.create_order(build).unwrap().id
        };
        let storage = Storage::open(&path).unwrap();
        assert!(storage.get_order(id).unwrap().is_some());
        assert_eq!(storage.create_order(build).unwrap().order_number, 2);
    }
}
