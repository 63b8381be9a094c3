use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::audit::AuditService;
use crate::consent::ConsentOrchestrator;
use crate::core::errors::{AppError, AppResult};
use crate::core::keyed_lock::KeyedLock;
use crate::gateway::GatewayClient;
use crate::hifetch::hifetch_sql::*;
use crate::hifetch::hifetch_types::{HealthRecordsCallbackPayload, HiRequestInitPayload, InitiateFetchPayload};
use crate::hifetch::hifetch_worker::{HiFetchWorkerPool, WorkItem};
use crate::models::types::HiType;
use crate::models::{FetchStatus, HiFetchRequest};

/// Result of an inbound health-record callback: either the batch was
/// accepted onto the processing queue, or the queue is saturated and the
/// caller must signal ABDM to retry (spec.md §5).
pub enum IngestOutcome {
    Accepted,
    Backpressure,
}

/// Orchestrates health-information fetches (spec.md §4.C): validates a
/// fetch request against its consent artifact's grant, initiates it with
/// the gateway, and routes inbound record batches onto the worker pool.
pub struct HiFetchOrchestrator {
    pool: PgPool,
    gateway: Arc<GatewayClient>,
    audit: Arc<AuditService>,
    consent: Arc<ConsentOrchestrator>,
    callback_url: String,
    fetch_locks: Arc<KeyedLock<Uuid>>,
    workers: Arc<HiFetchWorkerPool>,
}

impl HiFetchOrchestrator {
    pub fn new(
        pool: PgPool,
        gateway: Arc<GatewayClient>,
        audit: Arc<AuditService>,
        consent: Arc<ConsentOrchestrator>,
        callback_url: String,
        fetch_locks: Arc<KeyedLock<Uuid>>,
        workers: Arc<HiFetchWorkerPool>,
    ) -> Self {
        Self {
            pool,
            gateway,
            audit,
            consent,
            callback_url,
            fetch_locks,
            workers,
        }
    }

    /// Validates the fetch against the consent artifact's grant (subset of
    /// hiTypes, date range within the granted window), persists it as
    /// PROCESSING, and submits it to the gateway (spec.md §4.C).
    pub async fn initiate_fetch(&self, payload: InitiateFetchPayload, doctor_id: Uuid) -> AppResult<HiFetchRequest> {
        let artifact = self
            .consent
            .get_active_artifact(payload.consent_request_id)
            .await?
            .ok_or_else(|| {
                AppError::PermissionScope(format!(
                    "no active consent artifact for consent request {}",
                    payload.consent_request_id
                ))
            })?;
        if !artifact.is_active() {
            return Err(AppError::PermissionScope("consent artifact is not active".into()));
        }

        let consent_request = self.consent.get_status(payload.consent_request_id).await?;
        if consent_request.patient_id != payload.patient_id {
            return Err(AppError::PermissionScope(
                "patientId does not match the consent request".into(),
            ));
        }
        if consent_request.requester_id != doctor_id {
            return Err(AppError::PermissionScope(
                "only the clinician who requested this consent may fetch against it".into(),
            ));
        }

        let hi_types: HashSet<HiType> = payload
            .hi_types
            .clone()
            .unwrap_or_else(|| artifact.permission.hi_types.clone());
        let date_range_from = payload.date_range_from.unwrap_or(artifact.permission.date_range_from);
        let date_range_to = payload.date_range_to.unwrap_or(artifact.permission.date_range_to);

        if !artifact.covers(&hi_types, date_range_from, date_range_to) {
            return Err(AppError::PermissionScope(
                "requested hiTypes or date range exceed the granted consent".into(),
            ));
        }

        let mut request = HiFetchRequest::new(artifact.id, payload.patient_id, doctor_id, hi_types, date_range_from, date_range_to);
        request.status = FetchStatus::Processing;
        self.insert(&request).await?;

        let init_body = HiRequestInitPayload {
            abdm_request_id: request.abdm_request_id,
            consent_artifact_id: artifact.abdm_artifact_id.clone(),
            hi_types: request.hi_types.iter().copied().collect(),
            date_range_from: request.date_range_from,
            date_range_to: request.date_range_to,
            callback_url: self.callback_url.clone(),
        };

        match self
            .gateway
            .post::<serde_json::Value>(
                "/health-information/cm/request",
                &init_body,
                Some(&request.id.to_string()),
            )
            .await
        {
            Ok(_) => Ok(request),
            Err(e) => {
                self.set_failed(request.id).await?;
                self.audit
                    .record_processing_log(&crate::models::ProcessingLog::new(
                        request.id,
                        None,
                        crate::models::ProcessingStage::Error,
                        crate::models::ProcessingOutcome::Failure,
                        0,
                        serde_json::json!({ "reason": e.to_string() }),
                    ))
                    .await
                    .context("failed to record hi fetch initiation failure")?;
                Err(e)
            }
        }
    }

    pub async fn get_status(&self, id: Uuid) -> AppResult<HiFetchRequest> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("hi fetch request {id} not found")))
    }

    /// Only legal from PENDING/PROCESSING (spec.md §4.C); later record
    /// arrivals for a cancelled fetch are logged and dropped by
    /// [`Self::ingest_records`] via the terminal-status check.
    pub async fn cancel_fetch(&self, id: Uuid) -> AppResult<HiFetchRequest> {
        let _guard = self.fetch_locks.lock(id).await;
        let request = self.get_status(id).await?;

        if !matches!(request.status, FetchStatus::Pending | FetchStatus::Processing) {
            return Err(AppError::Conflict(format!(
                "cannot cancel hi fetch request {id} in status {}",
                request.status
            )));
        }

        sqlx::query(UPDATE_HI_FETCH_COUNTERS)
            .bind(request.id)
            .bind(request.completed_records as i64)
            .bind(request.failed_records as i64)
            .bind(FetchStatus::Cancelled.to_string())
            .bind(Some(Utc::now()))
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to cancel hi fetch request")?;

        self.get_status(id).await
    }

    /// Reconciles an inbound health-record batch: dedups by
    /// (abdmRequestId, seq), drops batches for unknown or terminal
    /// requests, and enqueues each record for the worker pool.
    pub async fn ingest_records(&self, payload: HealthRecordsCallbackPayload) -> AppResult<IngestOutcome> {
        let request = match self.find_by_abdm_id(payload.abdm_request_id).await? {
            Some(r) => r,
            None => {
                tracing::warn!(abdm_request_id = %payload.abdm_request_id, "health record callback for unknown abdmRequestId");
                return Ok(IngestOutcome::Accepted);
            }
        };

        if self.is_duplicate(payload.abdm_request_id, payload.seq).await? {
            tracing::info!(hi_fetch_request_id = %request.id, seq = payload.seq, "duplicate health record callback, ignoring");
            return Ok(IngestOutcome::Accepted);
        }

        if request.status.is_terminal() {
            tracing::warn!(hi_fetch_request_id = %request.id, status = %request.status, "health record callback after terminal status, dropping");
            return Ok(IngestOutcome::Accepted);
        }

        if let Some(total) = payload.total_records {
            self.set_total_records(request.id, total).await?;
        } else if payload.end_of_stream {
            tracing::warn!(hi_fetch_request_id = %request.id, "end-of-stream callback carried no totalRecords, marking end_of_stream_received");
            self.mark_end_of_stream_received(request.id).await?;
        }

        let artifact = self.consent.get_artifact(request.consent_artifact_id).await?;

        for record in payload.records {
            let item = WorkItem {
                fetch_request_id: request.id,
                patient_id: request.patient_id,
                key_material: artifact.key_material.clone(),
                record,
            };
            if self.workers.try_enqueue(item).is_err() {
                return Ok(IngestOutcome::Backpressure);
            }
        }

        Ok(IngestOutcome::Accepted)
    }

    async fn insert(&self, request: &HiFetchRequest) -> AppResult<()> {
        sqlx::query(INSERT_HI_FETCH_REQUEST)
            .bind(request.id)
            .bind(request.consent_artifact_id)
            .bind(request.patient_id)
            .bind(request.doctor_id)
            .bind(request.abdm_request_id)
            .bind(Json(&request.hi_types))
            .bind(request.date_range_from)
            .bind(request.date_range_to)
            .bind(request.status.to_string())
            .bind(request.total_records.map(|v| v as i64))
            .bind(request.completed_records as i64)
            .bind(request.failed_records as i64)
            .bind(request.end_of_stream_received)
            .bind(request.created_at)
            .bind(request.updated_at)
            .bind(request.terminal_at)
            .execute(&self.pool)
            .await
            .context("failed to insert hi fetch request")?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<HiFetchRequest>> {
        let row = sqlx::query(GET_HI_FETCH_REQUEST_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch hi fetch request")?;
        Ok(row.map(row_to_fetch_request))
    }

    async fn find_by_abdm_id(&self, abdm_request_id: Uuid) -> AppResult<Option<HiFetchRequest>> {
        let row = sqlx::query(GET_HI_FETCH_REQUEST_BY_ABDM_ID)
            .bind(abdm_request_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch hi fetch request by abdmRequestId")?;
        Ok(row.map(row_to_fetch_request))
    }

    async fn set_total_records(&self, id: Uuid, total: u32) -> AppResult<()> {
        sqlx::query(SET_HI_FETCH_TOTAL_RECORDS)
            .bind(id)
            .bind(total as i64)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to set hi fetch totalRecords")?;
        Ok(())
    }

    /// Alternate termination trigger for fetches whose gateway never sends
    /// a `totalRecords` (spec.md §4.C, §6.2): without this, such a fetch
    /// stays PROCESSING until the watchdog's stall timeout forces it PARTIAL.
    async fn mark_end_of_stream_received(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(SET_HI_FETCH_END_OF_STREAM)
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to mark hi fetch end_of_stream_received")?;
        Ok(())
    }

    async fn set_failed(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(UPDATE_HI_FETCH_STATUS)
            .bind(id)
            .bind(FetchStatus::Failed.to_string())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to mark hi fetch request as FAILED")?;
        Ok(())
    }

    /// Non-terminal fetches that haven't progressed since before `cutoff`
    /// (spec.md §4.C watchdog: a fetch stuck past the timeout is force-
    /// finalized rather than left open forever).
    pub async fn list_stalled(&self, cutoff: chrono::DateTime<Utc>) -> AppResult<Vec<HiFetchRequest>> {
        let rows = sqlx::query(LIST_NON_TERMINAL_HI_FETCH_REQUESTS)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .context("failed to list stalled hi fetch requests")?;
        Ok(rows.into_iter().map(row_to_fetch_request).collect())
    }

    /// Force-finalizes a stalled fetch as PARTIAL: whatever records were
    /// completed stand, the rest are presumed lost (spec.md §4.C).
    pub async fn force_partial(&self, id: Uuid) -> AppResult<()> {
        let _guard = self.fetch_locks.lock(id).await;
        let request = self.get_status(id).await?;
        if request.status.is_terminal() {
            return Ok(());
        }

        sqlx::query(UPDATE_HI_FETCH_COUNTERS)
            .bind(request.id)
            .bind(request.completed_records as i64)
            .bind(request.failed_records as i64)
            .bind(FetchStatus::Partial.to_string())
            .bind(Some(Utc::now()))
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to force-finalize stalled hi fetch request")?;

        self.audit
            .record_processing_log(&crate::models::ProcessingLog::new(
                id,
                None,
                crate::models::ProcessingStage::Error,
                crate::models::ProcessingOutcome::Failure,
                0,
                serde_json::json!({ "reason": "watchdog timeout, force-finalized as PARTIAL" }),
            ))
            .await
            .context("failed to record watchdog timeout processing log")?;
        Ok(())
    }

    async fn is_duplicate(&self, abdm_request_id: Uuid, seq: i64) -> AppResult<bool> {
        let result = sqlx::query(INSERT_HI_FETCH_CALLBACK_DEDUP)
            .bind(abdm_request_id)
            .bind(seq)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to record hi fetch callback dedup entry")?;
        Ok(result.rows_affected() == 0)
    }
}

pub(crate) fn row_to_fetch_request(row: sqlx::postgres::PgRow) -> HiFetchRequest {
    let hi_types: Json<HashSet<HiType>> = row.get("hi_types");
    HiFetchRequest {
        id: row.get("id"),
        consent_artifact_id: row.get("consent_artifact_id"),
        patient_id: row.get("patient_id"),
        doctor_id: row.get("doctor_id"),
        abdm_request_id: row.get("abdm_request_id"),
        hi_types: hi_types.0,
        date_range_from: row.get("date_range_from"),
        date_range_to: row.get("date_range_to"),
        status: parse_fetch_status(&row.get::<String, _>("status")),
        total_records: row.get::<Option<i64>, _>("total_records").map(|v| v as u32),
        completed_records: row.get::<i64, _>("completed_records") as u32,
        failed_records: row.get::<i64, _>("failed_records") as u32,
        end_of_stream_received: row.get("end_of_stream_received"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        terminal_at: row.get("terminal_at"),
    }
}

pub(crate) fn parse_fetch_status(s: &str) -> FetchStatus {
    match s {
        "PENDING" => FetchStatus::Pending,
        "PROCESSING" => FetchStatus::Processing,
        "COMPLETED" => FetchStatus::Completed,
        "PARTIAL" => FetchStatus::Partial,
        "FAILED" => FetchStatus::Failed,
        "CANCELLED" => FetchStatus::Cancelled,
        other => panic!("unknown fetch status in storage: {other}"),
    }
}
