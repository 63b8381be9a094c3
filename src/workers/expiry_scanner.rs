use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::consent::ConsentOrchestrator;
use crate::models::constants::EXPIRY_SCANNER_MIN_INTERVAL;
use crate::workers::leader_lease::LeaderLease;
use crate::workers::LEADER_LEASE_KEY_EXPIRY_SCANNER;

/// Transitions consent requests and artifacts past their time windows to
/// EXPIRED (spec.md §4.B). Runs at most once per
/// [`EXPIRY_SCANNER_MIN_INTERVAL`] and only on the instance holding the
/// leader lease.
pub async fn run(pool: PgPool, consent: Arc<ConsentOrchestrator>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(EXPIRY_SCANNER_MIN_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("expiry scanner stopping on shutdown");
                return;
            }
            _ = interval.tick() => {
                match LeaderLease::try_acquire(&pool, LEADER_LEASE_KEY_EXPIRY_SCANNER).await {
                    Ok(Some(lease)) => {
                        if let Err(e) = scan_once(&consent).await {
                            tracing::error!(error = %e, "expiry scan failed");
                        }
                        lease.release().await;
                    }
                    Ok(None) => tracing::debug!("expiry scanner lease held by another instance, skipping tick"),
                    Err(e) => tracing::error!(error = %e, "failed to acquire expiry scanner leader lease"),
                }
            }
        }
    }
}

async fn scan_once(consent: &Arc<ConsentOrchestrator>) -> anyhow::Result<()> {
    let now = Utc::now();

    let expired_requests = consent.list_expired_requests(now).await?;
    for request in expired_requests {
        if let Err(e) = consent.expire_request(request.id).await {
            tracing::error!(consent_request_id = %request.id, error = %e, "failed to expire consent request");
        }
    }

    let expired_artifacts = consent.list_expired_active_artifacts(now).await?;
    for artifact in expired_artifacts {
        if let Err(e) = consent.expire_artifact(artifact.id, artifact.consent_request_id).await {
            tracing::error!(consent_artifact_id = %artifact.id, error = %e, "failed to expire consent artifact");
        }
    }

    Ok(())
}
