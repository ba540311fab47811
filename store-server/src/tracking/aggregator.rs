//! Read-side tracking view
//!
//! Combines the authoritative order state with the tracking event history.
//! History order is carrier-reported occurrence time; arrival order never
//! matters because storage keys events by (occurred_at, received_at).

use serde::Serialize;
use shared::order::{Order, OrderState, TrackingEvent};

use crate::orders::{LedgerError, LedgerResult, OrderLedger};

/// Customer-facing tracking summary for one order
#[derive(Debug, Clone, Serialize)]
pub struct TrackingSummary {
    pub order_id: String,
    pub order_number: String,
    pub state: OrderState,
    pub carrier_code: Option<String>,
    pub tracking_code: Option<String>,
    /// Most recent milestone by occurrence time, if any
    pub latest_event: Option<TrackingEvent>,
    /// Full history, oldest first
    pub events: Vec<TrackingEvent>,
}

/// Read-side aggregator over the ledger
#[derive(Clone)]
pub struct TrackingAggregator {
    ledger: OrderLedger,
}

impl TrackingAggregator {
    pub fn new(ledger: OrderLedger) -> Self {
        Self { ledger }
    }

    /// Full tracking history for an order, oldest first
    pub fn history(&self, order_id: &str) -> LedgerResult<Vec<TrackingEvent>> {
        Ok(self.ledger.storage().tracking_events_for_order(order_id)?)
    }

    /// Order state plus ordered tracking history
    pub fn summary(&self, order_id: &str) -> LedgerResult<TrackingSummary> {
        let order = self
            .ledger
            .get_order(order_id)?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;
        let events = self.history(order_id)?;

        Ok(TrackingSummary {
            order_id: order.order_id,
            order_number: order.order_number,
            state: order.state,
            carrier_code: order.carrier_code,
            tracking_code: order.tracking_code,
            latest_event: events.last().cloned(),
            events,
        })
    }

    /// Orders currently in transit (refresh job input)
    pub fn orders_in_transit(&self) -> LedgerResult<Vec<Order>> {
        self.ledger.list_orders(Some(OrderState::Shipped))
    }
}
