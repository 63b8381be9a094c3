use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use sqlx::{PgPool, Row};
use tokio::sync::{mpsc, Mutex};
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::audit::AuditService;
use crate::core::errors::AppError;
use crate::core::keyed_lock::KeyedLock;
use crate::hifetch::hifetch_sql::*;
use crate::hifetch::hifetch_service::row_to_fetch_request;
use crate::hifetch::hifetch_types::HiRecordPayload;
use crate::models::constants::{HI_FETCH_QUEUE_CAPACITY, HI_FETCH_WORKER_POOL_SIZE};
use crate::models::{HealthRecord, ProcessingLog, ProcessingOutcome, ProcessingStage, RecordSource};
use crate::records::canonical::checksum;
use crate::records::records_service::RecordStore;

/// One inbound record queued for the Receive→Decrypt→Validate→Store
/// pipeline (spec.md §4.C).
pub struct WorkItem {
    pub fetch_request_id: Uuid,
    pub patient_id: Uuid,
    pub key_material: Option<String>,
    pub record: HiRecordPayload,
}

/// Bounded queue plus a fixed pool of workers draining it (spec.md §5).
/// Workers share one receiver behind a mutex: only one worker blocks in
/// `recv` at a time, but once it has an item the lock is released and the
/// record is processed concurrently with the rest of the pool.
pub struct HiFetchWorkerPool {
    tx: mpsc::Sender<WorkItem>,
}

impl HiFetchWorkerPool {
    pub fn spawn(pool: PgPool, records: Arc<RecordStore>, audit: Arc<AuditService>, fetch_locks: Arc<KeyedLock<Uuid>>) -> Self {
        let (tx, rx) = mpsc::channel(HI_FETCH_QUEUE_CAPACITY);
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..HI_FETCH_WORKER_POOL_SIZE {
            let rx = rx.clone();
            let pool = pool.clone();
            let records = records.clone();
            let audit = audit.clone();
            let fetch_locks = fetch_locks.clone();
            tokio::spawn(async move {
                loop {
                    let item = rx.lock().await.recv().await;
                    let Some(item) = item else {
                        tracing::debug!(worker_id, "hi fetch worker shutting down, queue closed");
                        break;
                    };
                    process_item(&pool, &records, &audit, &fetch_locks, item).await;
                }
            });
        }

        Self { tx }
    }

    /// Enqueues `item`, returning the item back to the caller when the
    /// queue is at capacity so the webhook can signal backpressure.
    pub fn try_enqueue(&self, item: WorkItem) -> Result<(), WorkItem> {
        match self.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) => Err(item),
            Err(TrySendError::Closed(item)) => Err(item),
        }
    }
}

async fn process_item(
    pool: &PgPool,
    records: &Arc<RecordStore>,
    audit: &Arc<AuditService>,
    fetch_locks: &Arc<KeyedLock<Uuid>>,
    item: WorkItem,
) {
    let started = Instant::now();
    let fetch_request_id = item.fetch_request_id;
    let abdm_record_id = Some(item.record.care_context_reference.clone());

    audit_log(
        audit,
        fetch_request_id,
        abdm_record_id.clone(),
        ProcessingStage::Receive,
        ProcessingOutcome::Success,
        started,
        serde_json::json!({}),
        None,
    )
    .await;

    let plaintext = match item.key_material.as_deref() {
        None => {
            fail(audit, fetch_request_id, abdm_record_id.clone(), ProcessingStage::Decrypt, started, "no key material available for consent artifact").await;
            finalize(pool, fetch_locks, fetch_request_id, false).await;
            return;
        }
        Some(key_material) => match decrypt_payload(key_material, &item.record.content) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                fail(audit, fetch_request_id, abdm_record_id.clone(), ProcessingStage::Decrypt, started, &e.to_string()).await;
                finalize(pool, fetch_locks, fetch_request_id, false).await;
                return;
            }
        },
    };

    let parsed: serde_json::Value = match serde_json::from_slice(&plaintext) {
        Ok(v) => v,
        Err(e) => {
            fail(audit, fetch_request_id, abdm_record_id.clone(), ProcessingStage::Validate, started, &format!("decrypted payload is not valid JSON: {e}")).await;
            finalize(pool, fetch_locks, fetch_request_id, false).await;
            return;
        }
    };

    if let Err(reason) = validate_record(&parsed, item.patient_id, &item.record.checksum) {
        fail(audit, fetch_request_id, abdm_record_id.clone(), ProcessingStage::Validate, started, &reason).await;
        finalize(pool, fetch_locks, fetch_request_id, false).await;
        return;
    }

    let record = HealthRecord::new(
        item.patient_id,
        Some(fetch_request_id),
        abdm_record_id.clone(),
        item.record.record_type.clone(),
        item.record.record_date,
        item.record.provider_id.clone(),
        item.record.provider_name.clone(),
        item.record.provider_type.clone(),
        parsed,
        String::new(),
        RecordSource::Abdm,
        1,
    );

    match records.put(record).await {
        Ok(stored) => {
            audit_log(
                audit,
                fetch_request_id,
                abdm_record_id,
                ProcessingStage::Store,
                ProcessingOutcome::Success,
                started,
                serde_json::json!({ "healthRecordId": stored.id }),
                Some(stored.id),
            )
            .await;
            finalize(pool, fetch_locks, fetch_request_id, true).await;
        }
        Err(e) => {
            fail(audit, fetch_request_id, abdm_record_id, ProcessingStage::Store, started, &e.to_string()).await;
            finalize(pool, fetch_locks, fetch_request_id, false).await;
        }
    }
}

fn decrypt_payload(key_material: &str, content_b64: &str) -> Result<Vec<u8>, AppError> {
    let key_bytes = BASE64
        .decode(key_material)
        .map_err(|e| AppError::Decryption(format!("consent artifact key material is not valid base64: {e}")))?;
    let unbound = UnboundKey::new(&AES_256_GCM, &key_bytes)
        .map_err(|_| AppError::Decryption("consent artifact key material is not a valid AES-256 key".to_string()))?;
    let key = LessSafeKey::new(unbound);

    let mut combined = BASE64
        .decode(content_b64)
        .map_err(|e| AppError::Decryption(format!("record content is not valid base64: {e}")))?;
    if combined.len() < NONCE_LEN {
        return Err(AppError::Decryption("record content is shorter than the AEAD nonce".into()));
    }
    let (nonce_bytes, ciphertext) = combined.split_at_mut(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| AppError::Decryption("invalid AEAD nonce".to_string()))?;
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), ciphertext)
        .map_err(|_| AppError::Decryption("AEAD decryption failed, ciphertext or key is wrong".to_string()))?;
    Ok(plaintext.to_vec())
}

/// Confirms the decrypted bundle looks like FHIR, references the expected
/// patient, and matches the checksum ABDM declared for it (spec.md §4.C,
/// §8 invariant 2).
fn validate_record(parsed: &serde_json::Value, patient_id: Uuid, declared_checksum: &str) -> Result<(), String> {
    if parsed.get("resourceType").and_then(|v| v.as_str()).is_none() {
        return Err("decrypted payload has no resourceType".into());
    }
    let haystack = parsed.to_string();
    if !haystack.contains(&patient_id.to_string()) {
        return Err("decrypted payload does not reference the expected patient".into());
    }
    let recomputed = checksum(parsed);
    if recomputed != declared_checksum {
        return Err("declared checksum does not match the decrypted payload".into());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn audit_log(
    audit: &Arc<AuditService>,
    fetch_request_id: Uuid,
    abdm_record_id: Option<String>,
    stage: ProcessingStage,
    outcome: ProcessingOutcome,
    started: Instant,
    details: serde_json::Value,
    health_record_id: Option<Uuid>,
) {
    let mut log = ProcessingLog::new(
        fetch_request_id,
        abdm_record_id,
        stage,
        outcome,
        started.elapsed().as_millis() as u64,
        details,
    );
    if let Some(id) = health_record_id {
        log = log.with_health_record(id);
    }
    if let Err(e) = audit.record_processing_log(&log).await {
        tracing::error!(%fetch_request_id, error = %e, "failed to record processing log");
    }
}

async fn fail(audit: &Arc<AuditService>, fetch_request_id: Uuid, abdm_record_id: Option<String>, stage: ProcessingStage, started: Instant, reason: &str) {
    tracing::warn!(%fetch_request_id, ?stage, reason, "hi fetch record processing failed");
    audit_log(
        audit,
        fetch_request_id,
        abdm_record_id,
        stage,
        ProcessingOutcome::Failure,
        started,
        serde_json::json!({ "reason": reason }),
        None,
    )
    .await;
}

/// Applies one record's outcome to the fetch's counters, serialized per
/// fetch so concurrent workers on the same fetch never race the
/// read-increment-write sequence (spec.md §5).
async fn finalize(pool: &PgPool, fetch_locks: &Arc<KeyedLock<Uuid>>, fetch_request_id: Uuid, succeeded: bool) {
    let _guard = fetch_locks.lock(fetch_request_id).await;

    let row = match sqlx::query(GET_HI_FETCH_REQUEST_BY_ID)
        .bind(fetch_request_id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(row)) => row,
        Ok(None) => {
            tracing::error!(%fetch_request_id, "hi fetch request vanished before counters could be updated");
            return;
        }
        Err(e) => {
            tracing::error!(%fetch_request_id, error = %e, "failed to load hi fetch request for counter update");
            return;
        }
    };

    let mut request = row_to_fetch_request(row);
    if request.status.is_terminal() {
        return;
    }

    if succeeded {
        request.completed_records += 1;
    } else {
        request.failed_records += 1;
    }

    let new_status = if request.is_end_of_stream_complete() {
        request.terminal_status()
    } else {
        request.status
    };
    let terminal_at = if new_status.is_terminal() { Some(Utc::now()) } else { None };

    if let Err(e) = sqlx::query(UPDATE_HI_FETCH_COUNTERS)
        .bind(request.id)
        .bind(request.completed_records as i64)
        .bind(request.failed_records as i64)
        .bind(new_status.to_string())
        .bind(terminal_at)
        .bind(Utc::now())
        .execute(pool)
        .await
    {
        tracing::error!(%fetch_request_id, error = %e, "failed to update hi fetch counters");
    }
}
