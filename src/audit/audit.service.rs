use std::sync::Arc;

use anyhow::Context;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::audit::audit_sql::*;
use crate::audit::chain::{self, GENESIS_HASH};
use crate::core::keyed_lock::KeyedLock;
use crate::models::{
    AccessLog, AccessType, ConsentAuditEvent, ConsentAuditEventKind, ProcessingLog,
    ProcessingOutcome, ProcessingStage,
};

/// Appends to and queries the three regulatory log tables.
///
/// Consent events are chained (spec.md §8 invariant 5); `consent_locks`
/// serializes appends per consent so two concurrent writers can't both
/// read the same "last hash" and fork the chain.
pub struct AuditService {
    pool: PgPool,
    consent_locks: Arc<KeyedLock<Uuid>>,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            consent_locks: Arc::new(KeyedLock::new()),
        }
    }

    pub async fn record_consent_event(
        &self,
        consent_request_id: Uuid,
        event: ConsentAuditEventKind,
        actor: impl Into<String>,
        details: serde_json::Value,
    ) -> anyhow::Result<ConsentAuditEvent> {
        let _guard = self.consent_locks.lock(consent_request_id).await;

        let previous_hash: String = sqlx::query(GET_LAST_CONSENT_AUDIT_EVENT)
            .bind(consent_request_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to read last consent audit event")?
            .map(|row| row.get::<String, _>("chain_hash"))
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let entry = chain::next_event(
            consent_request_id,
            event,
            actor.into(),
            details,
            &previous_hash,
        );

        sqlx::query(INSERT_CONSENT_AUDIT_EVENT)
            .bind(entry.id)
            .bind(entry.consent_request_id)
            .bind(entry.event.to_string())
            .bind(&entry.actor)
            .bind(&entry.details)
            .bind(entry.at)
            .bind(&entry.previous_hash)
            .bind(&entry.chain_hash)
            .execute(&self.pool)
            .await
            .context("failed to insert consent audit event")?;

        Ok(entry)
    }

    pub async fn list_consent_events(
        &self,
        consent_request_id: Uuid,
    ) -> anyhow::Result<Vec<ConsentAuditEvent>> {
        let rows = sqlx::query(GET_CONSENT_AUDIT_EVENTS)
            .bind(consent_request_id)
            .fetch_all(&self.pool)
            .await
            .context("failed to list consent audit events")?;

        Ok(rows
            .into_iter()
            .map(|row| ConsentAuditEvent {
                id: row.get("id"),
                consent_request_id: row.get("consent_request_id"),
                event: parse_event_kind(&row.get::<String, _>("event")),
                actor: row.get("actor"),
                details: row.get("details"),
                at: row.get("at"),
                previous_hash: row.get("previous_hash"),
                chain_hash: row.get("chain_hash"),
            })
            .collect())
    }

    /// Re-verifies the hash chain for a consent's audit trail end to end.
    pub async fn verify_consent_chain(&self, consent_request_id: Uuid) -> anyhow::Result<bool> {
        let events = self.list_consent_events(consent_request_id).await?;
        Ok(chain::verify_chain(&events))
    }

    pub async fn record_processing_log(&self, log: &ProcessingLog) -> anyhow::Result<()> {
        sqlx::query(INSERT_PROCESSING_LOG)
            .bind(log.id)
            .bind(log.fetch_request_id)
            .bind(log.health_record_id)
            .bind(&log.abdm_record_id)
            .bind(log.stage.to_string())
            .bind(log.outcome.to_string())
            .bind(log.processing_time_ms as i64)
            .bind(&log.details)
            .bind(log.at)
            .execute(&self.pool)
            .await
            .context("failed to insert processing log")?;
        Ok(())
    }

    pub async fn list_processing_logs(
        &self,
        fetch_request_id: Uuid,
    ) -> anyhow::Result<Vec<ProcessingLog>> {
        let rows = sqlx::query(GET_PROCESSING_LOGS_BY_FETCH)
            .bind(fetch_request_id)
            .fetch_all(&self.pool)
            .await
            .context("failed to list processing logs")?;

        Ok(rows
            .into_iter()
            .map(|row| ProcessingLog {
                id: row.get("id"),
                fetch_request_id: row.get("fetch_request_id"),
                health_record_id: row.get("health_record_id"),
                abdm_record_id: row.get("abdm_record_id"),
                stage: parse_stage(&row.get::<String, _>("stage")),
                outcome: parse_outcome(&row.get::<String, _>("outcome")),
                processing_time_ms: row.get::<i64, _>("processing_time_ms") as u64,
                details: row.get("details"),
                at: row.get("at"),
            })
            .collect())
    }

    pub async fn record_access(&self, log: &AccessLog) -> anyhow::Result<()> {
        sqlx::query(INSERT_ACCESS_LOG)
            .bind(log.id)
            .bind(log.health_record_id)
            .bind(&log.user_id)
            .bind(log.access_type.to_string())
            .bind(&log.ip)
            .bind(&log.user_agent)
            .bind(log.at)
            .execute(&self.pool)
            .await
            .context("failed to insert access log")?;
        Ok(())
    }

    pub async fn list_access_by_record(
        &self,
        health_record_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<AccessLog>> {
        let rows = sqlx::query(GET_ACCESS_LOGS_BY_RECORD)
            .bind(health_record_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("failed to list access logs by record")?;
        Ok(rows.into_iter().map(row_to_access_log).collect())
    }

    pub async fn list_access_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<AccessLog>> {
        let rows = sqlx::query(GET_ACCESS_LOGS_BY_USER)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("failed to list access logs by user")?;
        Ok(rows.into_iter().map(row_to_access_log).collect())
    }
}

fn row_to_access_log(row: sqlx::postgres::PgRow) -> AccessLog {
    AccessLog {
        id: row.get("id"),
        health_record_id: row.get("health_record_id"),
        user_id: row.get("user_id"),
        access_type: parse_access_type(&row.get::<String, _>("access_type")),
        ip: row.get("ip"),
        user_agent: row.get("user_agent"),
        at: row.get("at"),
    }
}

fn parse_event_kind(s: &str) -> ConsentAuditEventKind {
    match s {
        "CREATED" => ConsentAuditEventKind::Created,
        "SUBMITTED" => ConsentAuditEventKind::Submitted,
        "GRANTED" => ConsentAuditEventKind::Granted,
        "DENIED" => ConsentAuditEventKind::Denied,
        "EXPIRED" => ConsentAuditEventKind::Expired,
        "REVOKED" => ConsentAuditEventKind::Revoked,
        "ERROR" => ConsentAuditEventKind::Error,
        "CALLBACK_RECEIVED" => ConsentAuditEventKind::CallbackReceived,
        "CALLBACK_ORPHAN" => ConsentAuditEventKind::CallbackOrphan,
        "CALLBACK_AFTER_TERMINAL" => ConsentAuditEventKind::CallbackAfterTerminal,
        other => panic!("unknown consent audit event kind in storage: {other}"),
    }
}

fn parse_stage(s: &str) -> ProcessingStage {
    match s {
        "RECEIVE" => ProcessingStage::Receive,
        "DECRYPT" => ProcessingStage::Decrypt,
        "VALIDATE" => ProcessingStage::Validate,
        "STORE" => ProcessingStage::Store,
        "ERROR" => ProcessingStage::Error,
        other => panic!("unknown processing stage in storage: {other}"),
    }
}

fn parse_outcome(s: &str) -> ProcessingOutcome {
    match s {
        "SUCCESS" => ProcessingOutcome::Success,
        "FAILURE" => ProcessingOutcome::Failure,
        other => panic!("unknown processing outcome in storage: {other}"),
    }
}

fn parse_access_type(s: &str) -> AccessType {
    match s {
        "VIEW" => AccessType::View,
        "EXPORT" => AccessType::Export,
        "PRINT" => AccessType::Print,
        "SHARE" => AccessType::Share,
        other => panic!("unknown access type in storage: {other}"),
    }
}
