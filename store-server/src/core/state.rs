use std::sync::Arc;

use crate::auth::JwtService;
use crate::carrier::{CarrierRegistry, HttpCarrier};
use crate::core::Config;
use crate::gateway::{HttpPaymentGateway, PaymentGateway};
use crate::orders::{LedgerStorage, OrderLedger};
use crate::rate_limit::RateLimiter;
use crate::reconciliation::ReconciliationEngine;
use crate::tracking::{TrackingAggregator, TrackingRefresher};
use crate::webhook::WebhookIngestor;

/// Server state - shared references to every service
///
/// Cloning is cheap; everything heavy sits behind an Arc.
///
/// | Field | Description |
/// |-------|-------------|
/// | config | Immutable configuration |
/// | ledger | Order ledger (redb-backed) |
/// | gateway | Payment gateway adapter |
/// | carriers | Carrier registry |
/// | ingestor | Webhook ingestion pipeline |
/// | tracker | Read-side tracking aggregator |
/// | refresher | Pull-carrier tracking refresher |
/// | recon | Reconciliation engine |
/// | rate_limiter | Fixed-window rate limiter |
/// | jwt | Admin JWT service |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub ledger: OrderLedger,
    pub gateway: Arc<dyn PaymentGateway>,
    pub carriers: Arc<CarrierRegistry>,
    pub ingestor: WebhookIngestor,
    pub tracker: TrackingAggregator,
    pub refresher: TrackingRefresher,
    pub recon: ReconciliationEngine,
    pub rate_limiter: Arc<RateLimiter>,
    pub jwt: Arc<JwtService>,
}

impl ServerState {
    /// Initialize all services from configuration
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let storage = LedgerStorage::open(config.ledger_path())?;

        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(HttpPaymentGateway::new(config.gateway.clone()));

        let mut carriers = CarrierRegistry::new();
        for carrier_config in &config.carriers {
            carriers.register(Arc::new(HttpCarrier::new(carrier_config.clone())));
        }

        tracing::info!(
            carriers = config.carriers.len(),
            ledger = %config.ledger_path().display(),
            "Server state initialized"
        );
        Ok(Self::assemble(config.clone(), storage, gateway, carriers))
    }

    /// Wire services around pre-built storage and adapters
    ///
    /// Used by [`initialize`](Self::initialize) and by tests that inject
    /// in-memory storage or scripted adapters.
    pub fn assemble(
        config: Config,
        storage: LedgerStorage,
        gateway: Arc<dyn PaymentGateway>,
        carriers: CarrierRegistry,
    ) -> Self {
        let carriers = Arc::new(carriers);
        let ledger = OrderLedger::new(storage);
        let ingestor = WebhookIngestor::new(ledger.clone(), gateway.clone(), carriers.clone());
        let tracker = TrackingAggregator::new(ledger.clone());
        let refresher = TrackingRefresher::new(ledger.clone(), carriers.clone());
        let recon = ReconciliationEngine::new(ledger.clone(), gateway.clone());
        let jwt = Arc::new(JwtService::with_config(config.jwt.clone()));

        Self {
            config,
            ledger,
            gateway,
            carriers,
            ingestor,
            tracker,
            refresher,
            recon,
            rate_limiter: Arc::new(RateLimiter::new()),
            jwt,
        }
    }
}
