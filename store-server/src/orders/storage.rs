//! redb-based ledger storage
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Authoritative order records |
//! | `payment_ref_index` | `external_reference` | `order_id` | Callback → order lookup |
//! | `processed_events` | `external_event_id` | `ProcessedEvent` | Dedup log (insert-if-absent) |
//! | `payment_events` | `external_event_id` | `PaymentEvent` | Append-only audit log |
//! | `tracking_events` | `(order_ref, occurred_at, received_at, event_id)` | `TrackingEvent` | Ordered history |
//! | `recon_records` | `(detected_at, run_id, external_reference)` | `ReconciliationRecord` | Run history |
//! | `counters` | name | `u64` | Order number counter |
//!
//! # Durability
//!
//! redb commits are durable as soon as `commit()` returns (copy-on-write
//! with atomic pointer swap). Webhook handlers only acknowledge after the
//! transaction carrying the event has committed, which closes the
//! missed-event window the at-least-once contract relies on.
//!
//! The tracking key embeds `(occurred_at, received_at)` so a plain range
//! scan yields occurred-at order with received-at tiebreak; out-of-order
//! arrivals land at the right position by construction.

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use shared::order::{Order, OrderState, PaymentEvent, ReconciliationRecord, TrackingEvent};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Payment reference index: key = external_reference, value = order_id
const PAYMENT_REF_INDEX: TableDefinition<&str, &str> = TableDefinition::new("payment_ref_index");

/// Processed-event log: key = external_event_id, value = JSON ProcessedEvent
const PROCESSED_EVENTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("processed_events");

/// Payment event audit log: key = external_event_id, value = JSON PaymentEvent
const PAYMENT_EVENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("payment_events");

/// Tracking events: key = (order_ref, occurred_at_ms, received_at_ms, event_id)
const TRACKING_EVENTS_TABLE: TableDefinition<(&str, i64, i64, &str), &[u8]> =
    TableDefinition::new("tracking_events");

/// Reconciliation records: key = (detected_at_ms, run_id, external_reference)
///
/// The run id in the key keeps runs landing in the same millisecond from
/// overwriting each other's records.
const RECON_RECORDS_TABLE: TableDefinition<(i64, &str, &str), &[u8]> =
    TableDefinition::new("recon_records");

/// Counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const ORDER_COUNT_KEY: &str = "order_count";

/// Entry in the processed-event dedup log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedEvent {
    /// "gateway" or the carrier code
    pub source: String,
    pub recorded_at: DateTime<Utc>,
}

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

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Ledger storage backed by redb
#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<Database>,
}

impl LedgerStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, local development)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables up front so later read transactions never race
        // table creation
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(PAYMENT_REF_INDEX)?;
            let _ = write_txn.open_table(PROCESSED_EVENTS_TABLE)?;
            let _ = write_txn.open_table(PAYMENT_EVENTS_TABLE)?;
            let _ = write_txn.open_table(TRACKING_EVENTS_TABLE)?;
            let _ = write_txn.open_table(RECON_RECORDS_TABLE)?;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(ORDER_COUNT_KEY)?.is_none() {
                counters.insert(ORDER_COUNT_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Counters ==========

    /// Get and increment the order counter atomically, returning the new count
    pub fn next_order_count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let next = {
            let mut table = txn.open_table(COUNTERS_TABLE)?;
            let current = table.get(ORDER_COUNT_KEY)?.map(|g| g.value()).unwrap_or(0);
            let next = current + 1;
            table.insert(ORDER_COUNT_KEY, next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }

    // ========== Orders ==========

    /// Persist an order within an existing transaction
    pub fn store_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let bytes = serde_json::to_vec(order)?;
        table.insert(order.order_id.as_str(), bytes.as_slice())?;
        Ok(())
    }

    /// Persist an order in its own transaction
    pub fn put_order(&self, order: &Order) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.store_order_txn(&txn, order)?;
        txn.commit()?;
        Ok(())
    }

    /// Index an external payment reference to its order
    pub fn index_payment_ref_txn(
        &self,
        txn: &WriteTransaction,
        external_reference: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PAYMENT_REF_INDEX)?;
        table.insert(external_reference, order_id)?;
        Ok(())
    }

    /// Get an order by id
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Look up an order by its external payment reference
    pub fn find_order_by_payment_ref(
        &self,
        external_reference: &str,
    ) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(PAYMENT_REF_INDEX)?;
        let Some(guard) = index.get(external_reference)? else {
            return Ok(None);
        };
        let order_id = guard.value().to_string();
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id.as_str())? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// List orders, optionally filtered by state
    pub fn list_orders(&self, state: Option<OrderState>) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let order: Order = serde_json::from_slice(value.value())?;
            if state.is_none_or(|s| order.state == s) {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    // ========== Processed-event log (dedup) ==========

    /// Atomic insert-if-absent into the processed-event log
    ///
    /// Returns `true` if the event id was new (caller proceeds to apply),
    /// `false` if it was already present (duplicate delivery). Uniqueness
    /// holds because the insert happens inside the write transaction that
    /// also records the event — two concurrent deliveries of the same id
    /// serialize on the transaction and exactly one sees `true`.
    pub fn insert_processed_event_txn(
        &self,
        txn: &WriteTransaction,
        external_event_id: &str,
        source: &str,
    ) -> StorageResult<bool> {
        let mut table = txn.open_table(PROCESSED_EVENTS_TABLE)?;
        if table.get(external_event_id)?.is_some() {
            return Ok(false);
        }
        let entry = ProcessedEvent {
            source: source.to_string(),
            recorded_at: Utc::now(),
        };
        let bytes = serde_json::to_vec(&entry)?;
        table.insert(external_event_id, bytes.as_slice())?;
        Ok(true)
    }

    /// Read-only duplicate check
    pub fn is_event_processed(&self, external_event_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_EVENTS_TABLE)?;
        Ok(table.get(external_event_id)?.is_some())
    }

    // ========== Payment events (audit log) ==========

    /// Record a payment event within an existing transaction (append-only)
    pub fn store_payment_event_txn(
        &self,
        txn: &WriteTransaction,
        event: &PaymentEvent,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PAYMENT_EVENTS_TABLE)?;
        let bytes = serde_json::to_vec(event)?;
        table.insert(event.external_event_id.as_str(), bytes.as_slice())?;
        Ok(())
    }

    /// Get a recorded payment event by external id
    pub fn get_payment_event(
        &self,
        external_event_id: &str,
    ) -> StorageResult<Option<PaymentEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENT_EVENTS_TABLE)?;
        match table.get(external_event_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Payment events whose occurrence falls inside `[start, end]`
    ///
    /// Runs under a single read transaction, i.e. one consistent snapshot —
    /// reconciliation must not compare against a ledger that changes
    /// mid-scan.
    pub fn payment_events_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<PaymentEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENT_EVENTS_TABLE)?;
        let mut events = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let event: PaymentEvent = serde_json::from_slice(value.value())?;
            if event.occurred_at >= start && event.occurred_at <= end {
                events.push(event);
            }
        }
        Ok(events)
    }

    // ========== Tracking events ==========

    /// Record a tracking event within an existing transaction
    ///
    /// The composite key makes the event land at its occurred-at position
    /// regardless of arrival order.
    pub fn store_tracking_event_txn(
        &self,
        txn: &WriteTransaction,
        event: &TrackingEvent,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TRACKING_EVENTS_TABLE)?;
        let key = (
            event.order_ref.as_str(),
            event.occurred_at.timestamp_millis(),
            event.received_at.timestamp_millis(),
            event.external_event_id.as_str(),
        );
        let bytes = serde_json::to_vec(event)?;
        table.insert(key, bytes.as_slice())?;
        Ok(())
    }

    /// Ordered tracking history for one order (occurred-at, then received-at)
    pub fn tracking_events_for_order(&self, order_ref: &str) -> StorageResult<Vec<TrackingEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRACKING_EVENTS_TABLE)?;
        let mut events = Vec::new();
        let start = (order_ref, i64::MIN, i64::MIN, "");
        for entry in table.range(start..)? {
            let (key, value) = entry?;
            if key.value().0 != order_ref {
                break;
            }
            events.push(serde_json::from_slice(value.value())?);
        }
        Ok(events)
    }

    // ========== Reconciliation records ==========

    /// Persist one reconciliation run's records (append-only history)
    pub fn store_recon_records(
        &self,
        records: &[ReconciliationRecord],
    ) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(RECON_RECORDS_TABLE)?;
            for record in records {
                let key = (
                    record.detected_at.timestamp_millis(),
                    record.run_id.as_str(),
                    record.external_reference.as_str(),
                );
                let bytes = serde_json::to_vec(record)?;
                table.insert(key, bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Reconciliation records detected inside `[start, end]`
    pub fn recon_records_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<ReconciliationRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECON_RECORDS_TABLE)?;
        let mut records = Vec::new();
        let from = (start.timestamp_millis(), "", "");
        for entry in table.range(from..)? {
            let (key, value) = entry?;
            if key.value().0 > end.timestamp_millis() {
                break;
            }
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::LineItem;

    fn sample_order(id: &str) -> Order {
        Order::new(
            id.to_string(),
            format!("ORD-{}", id),
            "cust-1".to_string(),
            vec![LineItem {
                product_id: "p1".to_string(),
                name: "Mug".to_string(),
                quantity: 1,
                unit_price: "10.00".parse().unwrap(),
            }],
            "EUR".to_string(),
        )
    }

    #[test]
    fn order_roundtrip() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let order = sample_order("ord-1");
        storage.put_order(&order).unwrap();

        let loaded = storage.get_order("ord-1").unwrap().unwrap();
        assert_eq!(loaded.order_id, "ord-1");
        assert_eq!(loaded.total, order.total);
        assert!(storage.get_order("ord-404").unwrap().is_none());
    }

    #[test]
    fn processed_event_insert_if_absent() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        assert!(storage
            .insert_processed_event_txn(&txn, "evt-1", "gateway")
            .unwrap());
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        assert!(!storage
            .insert_processed_event_txn(&txn, "evt-1", "gateway")
            .unwrap());
        txn.commit().unwrap();

        assert!(storage.is_event_processed("evt-1").unwrap());
        assert!(!storage.is_event_processed("evt-2").unwrap());
    }

    #[test]
    fn tracking_events_scan_in_occurred_at_order() {
        use chrono::TimeZone;
        use shared::order::{TrackingEvent, TrackingEventCode};

        let storage = LedgerStorage::open_in_memory().unwrap();
        let at = |h: u32| Utc.with_ymd_and_hms(2025, 8, 1, h, 0, 0).unwrap();

        // Insert out of order: 12h, 08h, 10h
        for (id, occurred) in [("e1", at(12)), ("e2", at(8)), ("e3", at(10))] {
            let event = TrackingEvent {
                external_event_id: id.to_string(),
                order_ref: "ord-1".to_string(),
                carrier_code: "acme".to_string(),
                code: TrackingEventCode::InTransit,
                location: None,
                occurred_at: occurred,
                received_at: at(13),
            };
            let txn = storage.begin_write().unwrap();
            storage.store_tracking_event_txn(&txn, &event).unwrap();
            txn.commit().unwrap();
        }

        let history = storage.tracking_events_for_order("ord-1").unwrap();
        let ids: Vec<_> = history.iter().map(|e| e.external_event_id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e3", "e1"]);

        // Other orders are not included in the scan
        assert!(storage.tracking_events_for_order("ord-2").unwrap().is_empty());
    }

    #[test]
    fn recon_records_from_same_millisecond_do_not_collide() {
        use shared::order::{DiscrepancyKind, ReconciliationRecord};

        let storage = LedgerStorage::open_in_memory().unwrap();
        let detected_at = Utc::now();
        let record = |run_id: &str| ReconciliationRecord {
            run_id: run_id.to_string(),
            external_reference: "ref-1".to_string(),
            order_id: None,
            internal_amount: None,
            internal_status: None,
            gateway_amount: None,
            gateway_status: None,
            kind: DiscrepancyKind::MissingInternally,
            detected_at,
        };

        // Same detection instant, same reference, different runs
        storage.store_recon_records(&[record("run-a")]).unwrap();
        storage.store_recon_records(&[record("run-b")]).unwrap();

        let start = detected_at - chrono::Duration::seconds(1);
        let end = detected_at + chrono::Duration::seconds(1);
        let stored = storage.recon_records_in_window(start, end).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn counter_is_monotonic_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.redb");

        {
            let storage = LedgerStorage::open(&path).unwrap();
            assert_eq!(storage.next_order_count().unwrap(), 1);
            assert_eq!(storage.next_order_count().unwrap(), 2);
        }

        let storage = LedgerStorage::open(&path).unwrap();
        assert_eq!(storage.next_order_count().unwrap(), 3);
    }
}
