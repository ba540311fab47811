//! Background tasks
//!
//! - tracking refresh: polls pull-only carriers on a fixed interval
//! - rate limit sweep: evicts lapsed limiter buckets

use std::time::Duration;

use crate::core::ServerState;

/// Sweep cadence for lapsed rate-limit buckets
const RATE_LIMIT_SWEEP_SECS: u64 = 300;

impl ServerState {
    /// Spawn the long-running background tasks
    pub fn start_background_tasks(&self) {
        let refresher = self.refresher.clone();
        let refresh_interval = Duration::from_secs(self.config.tracking_refresh_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh_interval);
            // First tick fires immediately; skip it so startup isn't a poll storm
            ticker.tick().await;
            loop {
                ticker.tick().await;
                refresher.run_once().await;
            }
        });

        let limiter = self.rate_limiter.clone();
        let max_window = self
            .config
            .rate_limit
            .strict
            .window
            .max(self.config.rate_limit.standard.window);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(RATE_LIMIT_SWEEP_SECS));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep_expired(max_window * 2);
            }
        });

        tracing::info!(
            tracking_refresh_secs = self.config.tracking_refresh_secs,
            "Background tasks started"
        );
    }
}
