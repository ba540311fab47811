//! ReconciliationEngine - ledger vs settlement report
//!
//! # Run flow
//!
//! ```text
//! reconcile(start, end)
//!     ├─ 1. Snapshot internal payment events in the window (one read txn)
//!     ├─ 2. Fold to the latest event per external reference
//!     ├─ 3. Fetch the gateway settlement report for the same window
//!     ├─ 4. Merge-compare both sides by reference
//!     │      ├─ amounts differ (exact decimal compare) → AmountMismatch
//!     │      ├─ statuses differ                        → StatusMismatch
//!     │      ├─ gateway-only reference                 → MissingInternally
//!     │      └─ internal-only reference                → MissingOnGateway
//!     └─ 5. Append records; matched references are recorded too, so a run
//!            is a complete audit of its window
//! ```
//!
//! Input order never matters: both sides are folded and sorted by
//! reference before comparison.

use chrono::{DateTime, Utc};
use shared::PipelineResult;
use shared::order::{DiscrepancyKind, PaymentEvent, ReconciliationRecord, SettlementLine};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::gateway::PaymentGateway;
use crate::orders::OrderLedger;

/// Tallies for one reconciliation run
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RunSummary {
    pub references_compared: usize,
    pub matched: usize,
    pub discrepancies: usize,
}

/// Compares internal payment state against gateway settlement
#[derive(Clone)]
pub struct ReconciliationEngine {
    ledger: OrderLedger,
    gateway: Arc<dyn PaymentGateway>,
}

impl ReconciliationEngine {
    pub fn new(ledger: OrderLedger, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { ledger, gateway }
    }

    /// Run reconciliation over `[start, end]`, persist and return the records
    pub async fn reconcile(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PipelineResult<Vec<ReconciliationRecord>> {
        let internal = self
            .ledger
            .storage()
            .payment_events_in_window(start, end)
            .map_err(|e| shared::PipelineError::Storage(e.to_string()))?;
        let settlement = self.gateway.settlement_report(start, end).await?;

        let records = self.compare(internal, settlement)?;
        self.ledger
            .storage()
            .store_recon_records(&records)
            .map_err(|e| shared::PipelineError::Storage(e.to_string()))?;

        let summary = summarize(&records);
        tracing::info!(
            references = summary.references_compared,
            matched = summary.matched,
            discrepancies = summary.discrepancies,
            "Reconciliation run complete"
        );
        Ok(records)
    }

    /// Pure merge-compare; exposed separately so it can be tested without
    /// a gateway
    fn compare(
        &self,
        internal: Vec<PaymentEvent>,
        settlement: Vec<SettlementLine>,
    ) -> PipelineResult<Vec<ReconciliationRecord>> {
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let detected_at = Utc::now();

        // Latest event per reference wins; BTreeMap gives deterministic
        // reference order for free
        let mut ours: BTreeMap<String, PaymentEvent> = BTreeMap::new();
        for event in internal {
            match ours.get(&event.external_reference) {
                Some(existing) if existing.occurred_at >= event.occurred_at => {}
                _ => {
                    ours.insert(event.external_reference.clone(), event);
                }
            }
        }
        let mut theirs: BTreeMap<String, SettlementLine> = BTreeMap::new();
        for line in settlement {
            theirs.insert(line.external_reference.clone(), line);
        }

        let mut records = Vec::new();
        let references: std::collections::BTreeSet<&String> =
            ours.keys().chain(theirs.keys()).collect();

        for reference in references {
            let event = ours.get(reference);
            let line = theirs.get(reference);

            let order_id = self
                .ledger
                .storage()
                .find_order_by_payment_ref(reference)
                .map_err(|e| shared::PipelineError::Storage(e.to_string()))?
                .map(|order| order.order_id);

            let kind = match (event, line) {
                (Some(event), Some(line)) => {
                    // Exact compare; fixed-point decimals, never floats
                    if event.amount != line.amount {
                        DiscrepancyKind::AmountMismatch
                    } else if event.status != line.status {
                        DiscrepancyKind::StatusMismatch
                    } else {
                        DiscrepancyKind::None
                    }
                }
                (None, Some(_)) => DiscrepancyKind::MissingInternally,
                (Some(_), None) => DiscrepancyKind::MissingOnGateway,
                (None, None) => unreachable!("reference came from one of the maps"),
            };

            records.push(ReconciliationRecord {
                run_id: run_id.clone(),
                external_reference: reference.clone(),
                order_id,
                internal_amount: event.map(|e| e.amount),
                internal_status: event.map(|e| e.status),
                gateway_amount: line.map(|l| l.amount),
                gateway_status: line.map(|l| l.status),
                kind,
                detected_at,
            });
        }

        Ok(records)
    }

    /// Records whose detection time falls in `[start, end]`
    pub fn records_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PipelineResult<Vec<ReconciliationRecord>> {
        self.ledger
            .storage()
            .recon_records_in_window(start, end)
            .map_err(|e| shared::PipelineError::Storage(e.to_string()))
    }
}

/// Tally a run's records
pub fn summarize(records: &[ReconciliationRecord]) -> RunSummary {
    let matched = records
        .iter()
        .filter(|r| r.kind == DiscrepancyKind::None)
        .count();
    RunSummary {
        references_compared: records.len(),
        matched,
        discrepancies: records.len() - matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, GatewayResult, IntentResponse};
    use crate::orders::LedgerStorage;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shared::order::{Order, PaymentStatus};

    /// Gateway whose settlement report is a fixed script
    struct ScriptedGateway {
        lines: Vec<SettlementLine>,
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn create_intent(&self, _order: &Order) -> GatewayResult<IntentResponse> {
            Err(GatewayError::Unavailable("not scripted".into()))
        }

        fn parse_callback(&self, _raw: &[u8], _sig: &str) -> GatewayResult<PaymentEvent> {
            Err(GatewayError::InvalidPayload("not scripted".into()))
        }

        async fn settlement_report(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> GatewayResult<Vec<SettlementLine>> {
            Ok(self.lines.clone())
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn engine_with(lines: Vec<SettlementLine>) -> ReconciliationEngine {
        let ledger = OrderLedger::new(LedgerStorage::open_in_memory().unwrap());
        ReconciliationEngine::new(ledger, Arc::new(ScriptedGateway { lines }))
    }

    fn internal_event(reference: &str, status: PaymentStatus, amount: &str) -> PaymentEvent {
        PaymentEvent {
            external_event_id: format!("evt-{}", reference),
            external_reference: reference.to_string(),
            status,
            amount: dec(amount),
            occurred_at: Utc::now(),
            received_at: Utc::now(),
        }
    }

    fn line(reference: &str, status: PaymentStatus, amount: &str) -> SettlementLine {
        SettlementLine {
            external_reference: reference.to_string(),
            amount: dec(amount),
            status,
        }
    }

    fn kind_for<'a>(records: &'a [ReconciliationRecord], reference: &str) -> &'a DiscrepancyKind {
        &records
            .iter()
            .find(|r| r.external_reference == reference)
            .unwrap()
            .kind
    }

    #[test]
    fn amount_comparison_is_exact() {
        let engine = engine_with(vec![]);
        // 99.90 vs 100.00: a float comparison with tolerance would miss this
        let records = engine
            .compare(
                vec![internal_event("ref-1", PaymentStatus::Approved, "99.90")],
                vec![line("ref-1", PaymentStatus::Approved, "100.00")],
            )
            .unwrap();
        assert_eq!(*kind_for(&records, "ref-1"), DiscrepancyKind::AmountMismatch);
        let record = &records[0];
        assert_eq!(record.internal_amount, Some(dec("99.90")));
        assert_eq!(record.gateway_amount, Some(dec("100.00")));
    }

    #[test]
    fn all_discrepancy_kinds_detected() {
        let engine = engine_with(vec![]);
        let records = engine
            .compare(
                vec![
                    internal_event("match", PaymentStatus::Approved, "10.00"),
                    internal_event("amount", PaymentStatus::Approved, "10.00"),
                    internal_event("status", PaymentStatus::Approved, "10.00"),
                    internal_event("ours-only", PaymentStatus::Approved, "10.00"),
                ],
                vec![
                    line("match", PaymentStatus::Approved, "10.00"),
                    line("amount", PaymentStatus::Approved, "10.01"),
                    line("status", PaymentStatus::Refunded, "10.00"),
                    line("theirs-only", PaymentStatus::Approved, "10.00"),
                ],
            )
            .unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(*kind_for(&records, "match"), DiscrepancyKind::None);
        assert_eq!(*kind_for(&records, "amount"), DiscrepancyKind::AmountMismatch);
        assert_eq!(*kind_for(&records, "status"), DiscrepancyKind::StatusMismatch);
        assert_eq!(*kind_for(&records, "ours-only"), DiscrepancyKind::MissingOnGateway);
        assert_eq!(*kind_for(&records, "theirs-only"), DiscrepancyKind::MissingInternally);

        let summary = summarize(&records);
        assert_eq!(summary.references_compared, 5);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.discrepancies, 4);
    }

    #[test]
    fn input_order_does_not_change_the_outcome() {
        let engine = engine_with(vec![]);
        let events = vec![
            internal_event("b", PaymentStatus::Approved, "1.00"),
            internal_event("a", PaymentStatus::Approved, "2.00"),
            internal_event("c", PaymentStatus::Approved, "3.00"),
        ];
        let lines = vec![
            line("c", PaymentStatus::Approved, "3.00"),
            line("a", PaymentStatus::Approved, "2.50"),
            line("b", PaymentStatus::Approved, "1.00"),
        ];

        let forward = engine.compare(events.clone(), lines.clone()).unwrap();
        let mut shuffled_events = events;
        shuffled_events.reverse();
        let mut shuffled_lines = lines;
        shuffled_lines.reverse();
        let reversed = engine.compare(shuffled_events, shuffled_lines).unwrap();

        let kinds = |records: &[ReconciliationRecord]| {
            records
                .iter()
                .map(|r| (r.external_reference.clone(), r.kind.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(kinds(&forward), kinds(&reversed));
    }

    #[test]
    fn latest_event_per_reference_wins() {
        let engine = engine_with(vec![]);
        let older = PaymentEvent {
            occurred_at: Utc::now() - chrono::Duration::hours(2),
            ..internal_event("ref-1", PaymentStatus::Approved, "10.00")
        };
        let newer = PaymentEvent {
            external_event_id: "evt-newer".to_string(),
            ..internal_event("ref-1", PaymentStatus::Refunded, "10.00")
        };

        // Older event arrives second; it must not shadow the newer status
        let records = engine
            .compare(
                vec![newer, older],
                vec![line("ref-1", PaymentStatus::Refunded, "10.00")],
            )
            .unwrap();
        assert_eq!(*kind_for(&records, "ref-1"), DiscrepancyKind::None);
    }

    #[tokio::test]
    async fn run_history_is_append_only() {
        let engine = engine_with(vec![line("ref-h", PaymentStatus::Approved, "5.00")]);
        let start = Utc::now() - chrono::Duration::hours(1);

        // Back-to-back runs may share a detection millisecond; the run id
        // in the storage key keeps their records apart
        engine.reconcile(start, Utc::now()).await.unwrap();
        engine.reconcile(start, Utc::now()).await.unwrap();

        let records = engine
            .records_in_window(start, Utc::now() + chrono::Duration::seconds(1))
            .unwrap();
        // Two runs, two records for the same reference
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].run_id, records[1].run_id);
        assert!(records.iter().all(|r| r.kind == DiscrepancyKind::MissingInternally));
    }
}
