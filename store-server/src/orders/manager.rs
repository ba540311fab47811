//! OrderLedger - authoritative order lifecycle and event application
//!
//! # Application flow
//!
//! ```text
//! apply_payment_event(event)
//!     ├─ 1. Resolve order by external payment reference
//!     ├─ 2. Acquire per-order lock (serializes callbacks for one order)
//!     ├─ 3. Begin write transaction
//!     ├─ 4. Insert-if-absent into processed-event log (dedup)
//!     ├─ 5. Record event (append-only audit log)
//!     ├─ 6. Run state machine; on success update the order
//!     ├─ 7. Commit (event is durable even when the transition was rejected)
//!     └─ 8. Return outcome
//! ```
//!
//! Callbacks for different orders proceed fully in parallel; only steps for
//! the same order serialize on the per-order lock.

use chrono::{Local, Utc};
use dashmap::DashMap;
use shared::PipelineError;
use shared::order::{
    LineItem, Order, OrderEventKind, OrderState, PaymentEvent, PaymentStatus, TrackingEvent,
    TrackingEventCode,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::state_machine;
use super::storage::{LedgerStorage, StorageError};

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Illegal transition: {event} not applicable in state {from}")]
    IllegalTransition {
        from: OrderState,
        event: OrderEventKind,
    },
}

impl From<LedgerError> for PipelineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Storage(e) => PipelineError::Storage(e.to_string()),
            LedgerError::OrderNotFound(id) => PipelineError::NotFound(format!("order {}", id)),
            LedgerError::InvalidInput(msg) => PipelineError::InvalidInput(msg),
            LedgerError::IllegalTransition { from, event } => PipelineError::IllegalTransition {
                from: from.to_string(),
                event: event.to_string(),
            },
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Outcome of applying a normalized external event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Event recorded and the order advanced
    Applied {
        order_id: String,
        new_state: OrderState,
    },
    /// External event id already in the processed-event log; nothing reapplied
    Duplicate,
    /// Event recorded; it implies no state transition (e.g. pending, in-transit)
    Recorded,
    /// Event recorded for audit but no order matches its reference
    NoMatchingOrder,
    /// Event recorded for audit; the transition was illegal for the order's
    /// current state and the order is unchanged
    TransitionRejected {
        order_id: String,
        from: OrderState,
        event: OrderEventKind,
    },
}

/// The order ledger: exclusive owner of Order records
#[derive(Clone)]
pub struct OrderLedger {
    storage: LedgerStorage,
    /// Per-order locks; entries created lazily on first contention point
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl OrderLedger {
    pub fn new(storage: LedgerStorage) -> Self {
        Self {
            storage,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Get the underlying storage (read-side consumers: tracking, reconciliation)
    pub fn storage(&self) -> &LedgerStorage {
        &self.storage
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Generate the next human-readable order number (crash-safe via redb)
    fn next_order_number(&self) -> LedgerResult<String> {
        let count = self.storage.next_order_count()?;
        let date_str = Local::now().format("%Y%m%d").to_string();
        Ok(format!("ORD{}{}", date_str, 10000 + count))
    }

    // ========== Order creation ==========

    /// Create a new order in `Created` state
    ///
    /// The total is frozen here as the sum of line-item subtotals.
    pub fn create_order(
        &self,
        customer_ref: String,
        items: Vec<LineItem>,
        currency: String,
    ) -> LedgerResult<Order> {
        if items.is_empty() {
            return Err(LedgerError::InvalidInput("order has no line items".into()));
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(LedgerError::InvalidInput(format!(
                    "zero quantity for product {}",
                    item.product_id
                )));
            }
            if item.unit_price.is_sign_negative() {
                return Err(LedgerError::InvalidInput(format!(
                    "negative unit price for product {}",
                    item.product_id
                )));
            }
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(LedgerError::InvalidInput(format!(
                "invalid currency code: {}",
                currency
            )));
        }

        let order_id = format!("ord_{}", uuid::Uuid::new_v4().simple());
        let order_number = self.next_order_number()?;
        let order = Order::new(order_id, order_number, customer_ref, items, currency);
        self.storage.put_order(&order)?;
        tracing::info!(order_id = %order.order_id, order_number = %order.order_number, total = %order.total, "Order created");
        Ok(order)
    }

    // ========== Payment intent ==========

    /// Attach a gateway payment reference and move the order to AwaitingPayment
    pub async fn attach_intent(
        &self,
        order_id: &str,
        external_reference: &str,
    ) -> LedgerResult<Order> {
        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let mut order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        let next = state_machine::apply(order.state, OrderEventKind::IntentCreated).map_err(
            |_| LedgerError::IllegalTransition {
                from: order.state,
                event: OrderEventKind::IntentCreated,
            },
        )?;

        order.state = next;
        order.external_payment_ref = Some(external_reference.to_string());
        order.updated_at = Utc::now();

        let txn = self.storage.begin_write()?;
        self.storage.store_order_txn(&txn, &order)?;
        self.storage
            .index_payment_ref_txn(&txn, external_reference, order_id)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id = %order_id, external_reference = %external_reference, "Payment intent attached");
        Ok(order)
    }

    // ========== Event application ==========

    /// Apply a normalized payment event (idempotent under redelivery)
    pub async fn apply_payment_event(&self, event: PaymentEvent) -> LedgerResult<ApplyOutcome> {
        // Lock by order when the reference resolves, by reference otherwise,
        // so concurrent deliveries for one order can never race past each
        // other into the state machine.
        let lock_key = match self
            .storage
            .find_order_by_payment_ref(&event.external_reference)?
        {
            Some(order) => order.order_id,
            None => format!("ref:{}", event.external_reference),
        };
        let lock = self.lock_for(&lock_key);
        let _guard = lock.lock().await;

        // Re-read under the lock: the pre-lock peek may be stale
        let order = self
            .storage
            .find_order_by_payment_ref(&event.external_reference)?;

        let txn = self.storage.begin_write()?;
        if !self
            .storage
            .insert_processed_event_txn(&txn, &event.external_event_id, "gateway")?
        {
            txn.abort().map_err(StorageError::from)?;
            return Ok(ApplyOutcome::Duplicate);
        }
        self.storage.store_payment_event_txn(&txn, &event)?;

        let Some(mut order) = order else {
            txn.commit().map_err(StorageError::from)?;
            return Ok(ApplyOutcome::NoMatchingOrder);
        };

        let kind = match event.status {
            PaymentStatus::Approved => OrderEventKind::PaymentApproved,
            PaymentStatus::Rejected => OrderEventKind::PaymentRejected,
            PaymentStatus::Refunded => OrderEventKind::RefundApproved,
            PaymentStatus::Pending => {
                // Informational only; recorded but no transition implied
                txn.commit().map_err(StorageError::from)?;
                return Ok(ApplyOutcome::Recorded);
            }
        };

        match state_machine::apply(order.state, kind) {
            Ok(next) => {
                let order_id = order.order_id.clone();
                order.state = next;
                order.updated_at = Utc::now();
                self.storage.store_order_txn(&txn, &order)?;
                txn.commit().map_err(StorageError::from)?;
                Ok(ApplyOutcome::Applied {
                    order_id,
                    new_state: next,
                })
            }
            Err(_) => {
                // Keep the event for audit; order stays untouched
                let from = order.state;
                txn.commit().map_err(StorageError::from)?;
                Ok(ApplyOutcome::TransitionRejected {
                    order_id: order.order_id,
                    from,
                    event: kind,
                })
            }
        }
    }

    /// Apply a normalized tracking event (idempotent under redelivery)
    pub async fn apply_tracking_event(&self, event: TrackingEvent) -> LedgerResult<ApplyOutcome> {
        let lock = self.lock_for(&event.order_ref);
        let _guard = lock.lock().await;

        let order = self.storage.get_order(&event.order_ref)?;

        let txn = self.storage.begin_write()?;
        if !self.storage.insert_processed_event_txn(
            &txn,
            &event.external_event_id,
            &event.carrier_code,
        )? {
            txn.abort().map_err(StorageError::from)?;
            return Ok(ApplyOutcome::Duplicate);
        }
        self.storage.store_tracking_event_txn(&txn, &event)?;

        let Some(mut order) = order else {
            txn.commit().map_err(StorageError::from)?;
            return Ok(ApplyOutcome::NoMatchingOrder);
        };

        let kind = match event.code {
            TrackingEventCode::Dispatched => OrderEventKind::CarrierDispatched,
            TrackingEventCode::Delivered => OrderEventKind::CarrierDelivered,
            // Milestones that don't move the order state machine
            TrackingEventCode::InTransit
            | TrackingEventCode::Exception
            | TrackingEventCode::Unclassified(_) => {
                txn.commit().map_err(StorageError::from)?;
                return Ok(ApplyOutcome::Recorded);
            }
        };

        match state_machine::apply(order.state, kind) {
            Ok(next) => {
                let order_id = order.order_id.clone();
                order.state = next;
                order.updated_at = Utc::now();
                self.storage.store_order_txn(&txn, &order)?;
                txn.commit().map_err(StorageError::from)?;
                Ok(ApplyOutcome::Applied {
                    order_id,
                    new_state: next,
                })
            }
            Err(_) => {
                let from = order.state;
                txn.commit().map_err(StorageError::from)?;
                Ok(ApplyOutcome::TransitionRejected {
                    order_id: order.order_id,
                    from,
                    event: kind,
                })
            }
        }
    }

    // ========== Admin operations ==========

    /// Transition an order on behalf of an operator
    ///
    /// Only statuses the admin surface may set map to events; everything
    /// else is rejected before the state machine even runs. The state
    /// machine still gates the mapped event, so an admin can never force an
    /// illegal transition.
    pub async fn admin_transition(
        &self,
        order_id: &str,
        target: OrderState,
    ) -> LedgerResult<Order> {
        let kind = match target {
            OrderState::FulfillmentPending => OrderEventKind::FulfillmentStarted,
            OrderState::Cancelled => OrderEventKind::AdminCancelled,
            other => {
                return Err(LedgerError::InvalidInput(format!(
                    "status {} is not admin-settable",
                    other
                )));
            }
        };

        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let mut order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        let next = state_machine::apply(order.state, kind).map_err(|_| {
            LedgerError::IllegalTransition {
                from: order.state,
                event: kind,
            }
        })?;

        order.state = next;
        order.updated_at = Utc::now();
        self.storage.put_order(&order)?;
        tracing::info!(order_id = %order_id, new_state = %next, "Admin transition applied");
        Ok(order)
    }

    /// Record carrier/tracking assignment after label creation
    ///
    /// Does not change order state; only a carrier dispatch event does.
    pub async fn set_shipping_label(
        &self,
        order_id: &str,
        carrier_code: &str,
        tracking_code: &str,
    ) -> LedgerResult<Order> {
        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let mut order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;
        order.carrier_code = Some(carrier_code.to_string());
        order.tracking_code = Some(tracking_code.to_string());
        order.updated_at = Utc::now();
        self.storage.put_order(&order)?;
        Ok(order)
    }

    // ========== Queries ==========

    pub fn get_order(&self, order_id: &str) -> LedgerResult<Option<Order>> {
        Ok(self.storage.get_order(order_id)?)
    }

    pub fn list_orders(&self, state: Option<OrderState>) -> LedgerResult<Vec<Order>> {
        Ok(self.storage.list_orders(state)?)
    }
}
