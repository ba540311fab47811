//! Scheduled tracking refresh for pull-only carriers
//!
//! Push-capable carriers report through webhooks; the rest are polled here
//! on a fixed interval. A carrier failure only skips that carrier's orders
//! for the cycle, and every polled event re-enters through the ledger so
//! redundant milestones deduplicate exactly like redelivered webhooks.

use std::sync::Arc;

use crate::carrier::CarrierRegistry;
use crate::orders::OrderLedger;

use super::aggregator::TrackingAggregator;

/// One refresh cycle's tallies
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub orders_polled: usize,
    pub events_applied: usize,
    pub events_deduplicated: usize,
    pub carrier_failures: usize,
}

/// Polls pull-only carriers for in-transit orders
#[derive(Clone)]
pub struct TrackingRefresher {
    ledger: OrderLedger,
    aggregator: TrackingAggregator,
    carriers: Arc<CarrierRegistry>,
}

impl TrackingRefresher {
    pub fn new(ledger: OrderLedger, carriers: Arc<CarrierRegistry>) -> Self {
        let aggregator = TrackingAggregator::new(ledger.clone());
        Self {
            ledger,
            aggregator,
            carriers,
        }
    }

    /// Run one refresh cycle over all shipped orders
    pub async fn run_once(&self) -> RefreshReport {
        let mut report = RefreshReport::default();

        let orders = match self.aggregator.orders_in_transit() {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!(error = %e, "Tracking refresh could not list in-transit orders");
                return report;
            }
        };

        for order in orders {
            let Some(carrier_code) = order.carrier_code.as_deref() else {
                continue;
            };
            let carrier = match self.carriers.get(carrier_code) {
                Ok(carrier) => carrier,
                Err(e) => {
                    tracing::warn!(order_id = %order.order_id, error = %e, "Shipped order references unregistered carrier");
                    continue;
                }
            };
            if carrier.has_push_webhooks() {
                continue;
            }

            report.orders_polled += 1;
            let events = match carrier.poll_tracking(&order).await {
                Ok(events) => events,
                Err(e) => {
                    // One carrier being down must not starve the others
                    report.carrier_failures += 1;
                    tracing::warn!(carrier = %carrier_code, order_id = %order.order_id, error = %e, "Tracking poll failed");
                    continue;
                }
            };

            for event in events {
                match self.ledger.apply_tracking_event(event).await {
                    Ok(crate::orders::ApplyOutcome::Duplicate) => {
                        report.events_deduplicated += 1;
                    }
                    Ok(_) => report.events_applied += 1,
                    Err(e) => {
                        tracing::error!(order_id = %order.order_id, error = %e, "Failed to apply polled tracking event");
                    }
                }
            }
        }

        tracing::info!(
            orders_polled = report.orders_polled,
            events_applied = report.events_applied,
            events_deduplicated = report.events_deduplicated,
            carrier_failures = report.carrier_failures,
            "Tracking refresh cycle complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::{Carrier, CarrierError, CarrierResult, LabelInfo};
    use crate::orders::LedgerStorage;
    use async_trait::async_trait;
    use chrono::Utc;
    use shared::order::{LineItem, Order, OrderState, TrackingEvent, TrackingEventCode};

    /// Pull-only carrier returning a fixed event list (or failing)
    struct ScriptedCarrier {
        code: String,
        events: Vec<TrackingEvent>,
        fail: bool,
    }

    #[async_trait]
    impl Carrier for ScriptedCarrier {
        fn code(&self) -> &str {
            &self.code
        }

        fn has_push_webhooks(&self) -> bool {
            false
        }

        fn parse_webhook(&self, _raw: &[u8], _sig: &str) -> CarrierResult<TrackingEvent> {
            Err(CarrierError::InvalidPayload("pull-only carrier".into()))
        }

        async fn poll_tracking(&self, order: &Order) -> CarrierResult<Vec<TrackingEvent>> {
            if self.fail {
                return Err(CarrierError::Unavailable("scripted outage".into()));
            }
            let mut events = self.events.clone();
            for event in &mut events {
                event.order_ref = order.order_id.clone();
            }
            Ok(events)
        }

        async fn create_label(&self, _order: &Order) -> CarrierResult<LabelInfo> {
            Err(CarrierError::Unavailable("not scripted".into()))
        }
    }

    fn polled_event(event_id: &str, code: TrackingEventCode) -> TrackingEvent {
        TrackingEvent {
            external_event_id: event_id.to_string(),
            order_ref: String::new(),
            carrier_code: "slowpost".to_string(),
            code,
            location: None,
            occurred_at: Utc::now(),
            received_at: Utc::now(),
        }
    }

    async fn shipped_order(ledger: &OrderLedger, reference: &str, carrier: &str) -> Order {
        let order = ledger
            .create_order(
                "cust-1".to_string(),
                vec![LineItem {
                    product_id: "p1".to_string(),
                    name: "Mug".to_string(),
                    quantity: 1,
                    unit_price: "10.00".parse().unwrap(),
                }],
                "EUR".to_string(),
            )
            .unwrap();
        ledger.attach_intent(&order.order_id, reference).await.unwrap();
        ledger
            .apply_payment_event(shared::order::PaymentEvent {
                external_event_id: format!("pay-{}", reference),
                external_reference: reference.to_string(),
                status: shared::order::PaymentStatus::Approved,
                amount: "10.00".parse().unwrap(),
                occurred_at: Utc::now(),
                received_at: Utc::now(),
            })
            .await
            .unwrap();
        ledger
            .admin_transition(&order.order_id, OrderState::FulfillmentPending)
            .await
            .unwrap();
        ledger
            .set_shipping_label(&order.order_id, carrier, "TRACK-1")
            .await
            .unwrap();
        ledger
            .apply_tracking_event(TrackingEvent {
                external_event_id: format!("disp-{}", reference),
                order_ref: order.order_id.clone(),
                carrier_code: carrier.to_string(),
                code: TrackingEventCode::Dispatched,
                location: None,
                occurred_at: Utc::now(),
                received_at: Utc::now(),
            })
            .await
            .unwrap();
        order
    }

    #[tokio::test]
    async fn polled_events_deduplicate_across_cycles() {
        let ledger = OrderLedger::new(LedgerStorage::open_in_memory().unwrap());
        let order = shipped_order(&ledger, "ref-1", "slowpost").await;

        let mut carriers = CarrierRegistry::new();
        carriers.register(Arc::new(ScriptedCarrier {
            code: "slowpost".to_string(),
            events: vec![polled_event("poll-1", TrackingEventCode::InTransit)],
            fail: false,
        }));
        let refresher = TrackingRefresher::new(ledger.clone(), Arc::new(carriers));

        let first = refresher.run_once().await;
        assert_eq!(first.events_applied, 1);
        assert_eq!(first.events_deduplicated, 0);

        // Same milestone returned again next cycle
        let second = refresher.run_once().await;
        assert_eq!(second.events_applied, 0);
        assert_eq!(second.events_deduplicated, 1);

        let history = ledger
            .storage()
            .tracking_events_for_order(&order.order_id)
            .unwrap();
        // Dispatch + one polled milestone, not two
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn carrier_outage_does_not_starve_other_carriers() {
        let ledger = OrderLedger::new(LedgerStorage::open_in_memory().unwrap());
        shipped_order(&ledger, "ref-down", "downpost").await;
        let healthy = shipped_order(&ledger, "ref-up", "slowpost").await;

        let mut carriers = CarrierRegistry::new();
        carriers.register(Arc::new(ScriptedCarrier {
            code: "downpost".to_string(),
            events: vec![],
            fail: true,
        }));
        carriers.register(Arc::new(ScriptedCarrier {
            code: "slowpost".to_string(),
            events: vec![polled_event("poll-up", TrackingEventCode::InTransit)],
            fail: false,
        }));
        let refresher = TrackingRefresher::new(ledger.clone(), Arc::new(carriers));

        let report = refresher.run_once().await;
        assert_eq!(report.carrier_failures, 1);
        assert_eq!(report.events_applied, 1);

        let history = ledger
            .storage()
            .tracking_events_for_order(&healthy.order_id)
            .unwrap();
        assert_eq!(history.len(), 2);
    }
}
