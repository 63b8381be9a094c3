use std::sync::Arc;

use anyhow::Context;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::audit::AuditService;
use crate::core::errors::{AppError, AppResult};
use crate::models::constants::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::models::{AccessLog, AccessType, HealthRecord, ProcessingLog, ProcessingOutcome, ProcessingStage, RecordSource, RecordStatus};
use crate::records::canonical::checksum;
use crate::records::records_sql::*;
use crate::records::records_types::{AccessContext, FindRecordsFilters};

/// Record Store & Integrity Layer (spec.md §4.D): owns checksum
/// verification and the supersede-on-conflict versioning rule.
pub struct RecordStore {
    pool: PgPool,
    audit: Arc<AuditService>,
}

impl RecordStore {
    pub fn new(pool: PgPool, audit: Arc<AuditService>) -> Self {
        Self { pool, audit }
    }

    /// Inserts `record` with a freshly computed checksum. When an ACTIVE
    /// record already exists for the same `abdmRecordId`, it is superseded
    /// rather than overwritten (spec.md §4.D).
    pub async fn put(&self, mut record: HealthRecord) -> AppResult<HealthRecord> {
        record.checksum = checksum(&record.fhir_resource);

        if let Some(abdm_record_id) = record.abdm_record_id.clone() {
            if let Some(existing) = self.find_active_by_abdm_id(&abdm_record_id).await? {
                if existing.checksum != record.checksum {
                    record.version = existing.version + 1;
                    let mut tx = self
                        .pool
                        .begin()
                        .await
                        .context("failed to start supersede transaction")?;
                    sqlx::query(SUPERSEDE_HEALTH_RECORD)
                        .bind(existing.id)
                        .execute(&mut *tx)
                        .await
                        .context("failed to supersede existing health record")?;
                    insert(&mut tx, &record).await?;
                    tx.commit().await.context("failed to commit supersede transaction")?;
                    return Ok(record);
                }
                return Ok(existing);
            }
        }

        insert(&self.pool, &record).await?;
        Ok(record)
    }

    /// Fetches an ACTIVE record, re-verifying its checksum and logging
    /// access (spec.md §4.D, §8 invariant 2).
    pub async fn get(&self, id: Uuid, ctx: &AccessContext) -> AppResult<HealthRecord> {
        let record = self
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("health record {id} not found")))?;

        if record.status != RecordStatus::Active {
            return Err(AppError::NotFound(format!("health record {id} not found")));
        }

        let recomputed = checksum(&record.fhir_resource);
        if recomputed != record.checksum {
            tracing::error!(health_record_id = %id, "checksum mismatch on read, record may be corrupted");
            let log = ProcessingLog::new(
                record.fetch_request_id.unwrap_or(Uuid::nil()),
                record.abdm_record_id.clone(),
                ProcessingStage::Error,
                ProcessingOutcome::Failure,
                0,
                serde_json::json!({ "reason": "checksum mismatch on read", "healthRecordId": id }),
            )
            .with_health_record(id);
            self.audit
                .record_processing_log(&log)
                .await
                .context("failed to record integrity-failure processing log")?;
            return Err(AppError::Integrity(format!(
                "health record {id} failed checksum verification"
            )));
        }

        self.audit
            .record_access(&AccessLog::new(
                id,
                ctx.user_id,
                AccessType::View,
                ctx.ip.clone(),
                ctx.user_agent.clone(),
            ))
            .await
            .context("failed to record access log")?;

        Ok(record)
    }

    pub async fn find_by_patient(
        &self,
        patient_id: Uuid,
        filters: &FindRecordsFilters,
    ) -> AppResult<Vec<HealthRecord>> {
        let limit = filters
            .limit
            .unwrap_or(crate::models::constants::DEFAULT_PAGE_SIZE)
            .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE) as i64;
        let offset = filters.offset.unwrap_or(0) as i64;

        let rows = sqlx::query(FIND_HEALTH_RECORDS_BY_PATIENT)
            .bind(patient_id)
            .bind(&filters.record_type)
            .bind(filters.source.map(|s| s.to_string()))
            .bind(filters.from)
            .bind(filters.to)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("failed to find health records by patient")?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Logical delete only; physical deletion is a separate retention job
    /// outside this crate's scope (spec.md §4.D).
    pub async fn delete(&self, id: Uuid, actor: &str) -> AppResult<()> {
        let affected = sqlx::query(SOFT_DELETE_HEALTH_RECORD)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to soft-delete health record")?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound(format!("health record {id} not found")));
        }
        tracing::info!(health_record_id = %id, actor, "health record soft-deleted");
        Ok(())
    }

    /// Looks up a record without the access-logging/checksum side effects
    /// of [`Self::get`] — used by callers that need the record's ownership
    /// fields (e.g. `fetchRequestId`) to authorize access before reading it.
    pub async fn find(&self, id: Uuid) -> AppResult<Option<HealthRecord>> {
        let row = sqlx::query(GET_HEALTH_RECORD_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch health record")?;
        Ok(row.map(row_to_record))
    }

    async fn find_active_by_abdm_id(&self, abdm_record_id: &str) -> AppResult<Option<HealthRecord>> {
        let row = sqlx::query(GET_ACTIVE_BY_ABDM_RECORD_ID)
            .bind(abdm_record_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch health record by abdmRecordId")?;
        Ok(row.map(row_to_record))
    }
}

async fn insert<'e, E>(executor: E, record: &HealthRecord) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(INSERT_HEALTH_RECORD)
        .bind(record.id)
        .bind(record.patient_id)
        .bind(record.fetch_request_id)
        .bind(&record.abdm_record_id)
        .bind(&record.record_type)
        .bind(record.record_date)
        .bind(&record.provider_id)
        .bind(&record.provider_name)
        .bind(&record.provider_type)
        .bind(&record.fhir_resource)
        .bind(&record.checksum)
        .bind(record.source.to_string())
        .bind(record.status.to_string())
        .bind(record.version)
        .bind(record.created_at)
        .execute(executor)
        .await
        .context("failed to insert health record")?;
    Ok(())
}

fn row_to_record(row: sqlx::postgres::PgRow) -> HealthRecord {
    HealthRecord {
        id: row.get("id"),
        patient_id: row.get("patient_id"),
        fetch_request_id: row.get("fetch_request_id"),
        abdm_record_id: row.get("abdm_record_id"),
        record_type: row.get("record_type"),
        record_date: row.get("record_date"),
        provider_id: row.get("provider_id"),
        provider_name: row.get("provider_name"),
        provider_type: row.get("provider_type"),
        fhir_resource: row.get("fhir_resource"),
        checksum: row.get("checksum"),
        source: parse_record_source(&row.get::<String, _>("source")),
        status: parse_record_status(&row.get::<String, _>("status")),
        version: row.get("version"),
        created_at: row.get("created_at"),
    }
}

fn parse_record_source(s: &str) -> RecordSource {
    match s {
        "ABDM" => RecordSource::Abdm,
        "LOCAL" => RecordSource::Local,
        "IMPORTED" => RecordSource::Imported,
        other => panic!("unknown record source in storage: {other}"),
    }
}

fn parse_record_status(s: &str) -> RecordStatus {
    match s {
        "ACTIVE" => RecordStatus::Active,
        "SUPERSEDED" => RecordStatus::Superseded,
        "DELETED" => RecordStatus::Deleted,
        other => panic!("unknown record status in storage: {other}"),
    }
}
