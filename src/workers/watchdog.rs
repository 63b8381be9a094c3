use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::hifetch::HiFetchOrchestrator;
use crate::models::constants::HI_FETCH_WATCHDOG_TIMEOUT;
use crate::workers::leader_lease::LeaderLease;
use crate::workers::LEADER_LEASE_KEY_WATCHDOG;

/// Force-finalizes HI fetch requests that stopped progressing before
/// [`HI_FETCH_WATCHDOG_TIMEOUT`] elapsed (spec.md §4.C), so a dropped
/// end-of-stream callback can't leave a fetch PROCESSING forever.
pub async fn run(pool: PgPool, hifetch: Arc<HiFetchOrchestrator>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(HI_FETCH_WATCHDOG_TIMEOUT / 2);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("hi fetch watchdog stopping on shutdown");
                return;
            }
            _ = interval.tick() => {
                match LeaderLease::try_acquire(&pool, LEADER_LEASE_KEY_WATCHDOG).await {
                    Ok(Some(lease)) => {
                        if let Err(e) = scan_once(&hifetch).await {
                            tracing::error!(error = %e, "hi fetch watchdog scan failed");
                        }
                        lease.release().await;
                    }
                    Ok(None) => tracing::debug!("watchdog lease held by another instance, skipping tick"),
                    Err(e) => tracing::error!(error = %e, "failed to acquire watchdog leader lease"),
                }
            }
        }
    }
}

async fn scan_once(hifetch: &Arc<HiFetchOrchestrator>) -> anyhow::Result<()> {
    let cutoff = Utc::now() - chrono::Duration::from_std(HI_FETCH_WATCHDOG_TIMEOUT)?;
    let stalled = hifetch.list_stalled(cutoff).await?;

    for request in stalled {
        tracing::warn!(hi_fetch_request_id = %request.id, "hi fetch request stalled past watchdog timeout, forcing PARTIAL");
        if let Err(e) = hifetch.force_partial(request.id).await {
            tracing::error!(hi_fetch_request_id = %request.id, error = %e, "failed to force-finalize stalled hi fetch request");
        }
    }

    Ok(())
}
