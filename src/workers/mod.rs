//! Background maintenance loops (spec.md §5): a single leader per deployment
//! scans for expired consent and force-finalizes stalled HI fetch requests.
//! Both run on advisory-lock leader election so scaling the service out to
//! multiple instances doesn't double-run either scan.

pub mod expiry_scanner;
pub mod leader_lease;
pub mod watchdog;

use std::sync::Arc;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::consent::ConsentOrchestrator;
use crate::hifetch::HiFetchOrchestrator;

/// Advisory lock key for the expiry scanner (spec.md §4.B).
pub const LEADER_LEASE_KEY_EXPIRY_SCANNER: i64 = 1;
/// Advisory lock key for the HI fetch watchdog (spec.md §4.C).
pub const LEADER_LEASE_KEY_WATCHDOG: i64 = 2;

/// Spawns the expiry scanner and HI fetch watchdog as background tasks tied
/// to `shutdown`. Both loops exit on cancellation; callers await the
/// returned handles during graceful shutdown to let an in-flight tick finish.
pub struct WorkersModule {
    expiry_scanner: tokio::task::JoinHandle<()>,
    watchdog: tokio::task::JoinHandle<()>,
}

impl WorkersModule {
    pub fn spawn(
        pool: PgPool,
        consent: Arc<ConsentOrchestrator>,
        hifetch: Arc<HiFetchOrchestrator>,
        shutdown: CancellationToken,
    ) -> Self {
        let expiry_scanner = tokio::spawn(expiry_scanner::run(pool.clone(), consent, shutdown.clone()));
        let watchdog = tokio::spawn(watchdog::run(pool, hifetch, shutdown));
        Self {
            expiry_scanner,
            watchdog,
        }
    }

    /// Awaits both background loops, propagating shutdown drain time.
    pub async fn join(self) {
        if let Err(e) = self.expiry_scanner.await {
            tracing::error!(error = %e, "expiry scanner task panicked");
        }
        if let Err(e) = self.watchdog.await {
            tracing::error!(error = %e, "hi fetch watchdog task panicked");
        }
    }
}
