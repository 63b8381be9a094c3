use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::audit::AuditService;
use crate::consent::consent_signature::verify_artifact_signature;
use crate::consent::consent_sql::*;
use crate::consent::consent_types::{ArtifactPayload, ConsentCallbackPayload, ConsentInitPayload, RequestConsentPayload};
use crate::core::config::CallbackConfig;
use crate::core::errors::{AppError, AppResult};
use crate::core::keyed_lock::KeyedLock;
use crate::gateway::GatewayClient;
use crate::models::{
    ConsentArtifact, ConsentAuditEventKind, ConsentPermission, ConsentRequest, ConsentStatus,
    ArtifactStatus, ErrorRecoverability, HiType,
};

/// Orchestrates the consent lifecycle end to end (spec.md §4.B): issuing
/// requests to the gateway, reconciling callbacks against the state
/// transition table, and maintaining one ACTIVE artifact per GRANTED
/// consent.
pub struct ConsentOrchestrator {
    pool: PgPool,
    gateway: Arc<GatewayClient>,
    audit: Arc<AuditService>,
    callbacks: CallbackConfig,
    consent_locks: Arc<KeyedLock<Uuid>>,
    gateway_public_key: String,
}

impl ConsentOrchestrator {
    pub fn new(
        pool: PgPool,
        gateway: Arc<GatewayClient>,
        audit: Arc<AuditService>,
        callbacks: CallbackConfig,
        gateway_public_key: String,
    ) -> Self {
        Self {
            pool,
            gateway,
            audit,
            callbacks,
            consent_locks: Arc::new(KeyedLock::new()),
            gateway_public_key,
        }
    }

    pub async fn request_consent(
        &self,
        payload: RequestConsentPayload,
        actor: &str,
    ) -> AppResult<ConsentRequest> {
        let request = ConsentRequest::new(
            payload.patient_id,
            payload.patient_abha_id.clone(),
            payload.requester_id,
            payload.purpose_code.clone(),
            payload.purpose_text.clone(),
            payload.hi_types.clone(),
            payload.date_range_from,
            payload.date_range_to,
            payload.expires_at,
            payload.hips.clone(),
        );
        request
            .validate_invariants()
            .map_err(AppError::Validation)?;

        self.insert(&request).await?;
        self.audit
            .record_consent_event(
                request.id,
                ConsentAuditEventKind::Created,
                actor,
                serde_json::json!({ "patientId": request.patient_id }),
            )
            .await
            .context("failed to record CREATED audit event")?;

        let init_body = ConsentInitPayload {
            patient_abha_id: request.patient_abha_id.clone(),
            purpose_code: request.purpose_code.clone(),
            purpose_text: request.purpose_text.clone(),
            hi_types: request.hi_types.iter().copied().collect(),
            date_range_from: request.date_range_from,
            date_range_to: request.date_range_to,
            expires_at: request.expires_at,
            callback_url: self.callbacks.consent_callback_url.clone(),
        };

        match self
            .gateway
            .post::<crate::gateway::types::GatewayRequestAck>(
                "/consent-requests/init",
                &init_body,
                Some(&request.id.to_string()),
            )
            .await
        {
            Ok(ack) => {
                self.set_abdm_request_id(request.id, ack.abdm_request_id)
                    .await?;
                self.audit
                    .record_consent_event(
                        request.id,
                        ConsentAuditEventKind::Submitted,
                        "system",
                        serde_json::json!({ "abdmRequestId": ack.abdm_request_id }),
                    )
                    .await
                    .context("failed to record SUBMITTED audit event")?;
                let mut request = request;
                request.abdm_request_id = Some(ack.abdm_request_id);
                Ok(request)
            }
            Err(e) => {
                let recoverability = match &e {
                    AppError::GatewayUnavailable(_) => ErrorRecoverability::Recoverable,
                    _ => ErrorRecoverability::Fatal,
                };
                self.set_status(request.id, ConsentStatus::Error, Some(recoverability))
                    .await?;
                self.audit
                    .record_consent_event(
                        request.id,
                        ConsentAuditEventKind::Error,
                        "system",
                        serde_json::json!({ "reason": e.to_string(), "recoverable": recoverability == ErrorRecoverability::Recoverable }),
                    )
                    .await
                    .context("failed to record ERROR audit event")?;
                Err(e)
            }
        }
    }

    pub async fn get_status(&self, id: Uuid) -> AppResult<ConsentRequest> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("consent request {id} not found")))
    }

    pub async fn list_active(&self, patient_id: Uuid) -> AppResult<Vec<ConsentRequest>> {
        let rows = sqlx::query(LIST_ACTIVE_CONSENTS_BY_PATIENT)
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await
            .context("failed to list active consents")?;
        Ok(rows.into_iter().map(row_to_consent_request).collect())
    }

    pub async fn get_active_artifact(&self, consent_request_id: Uuid) -> AppResult<Option<ConsentArtifact>> {
        let row = sqlx::query(GET_ACTIVE_ARTIFACT_BY_CONSENT)
            .bind(consent_request_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch active artifact")?;
        Ok(row.map(row_to_artifact))
    }

    pub async fn get_artifact(&self, id: Uuid) -> AppResult<ConsentArtifact> {
        sqlx::query(GET_ARTIFACT_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch consent artifact")?
            .map(row_to_artifact)
            .ok_or_else(|| AppError::NotFound(format!("consent artifact {id} not found")))
    }

    /// Idempotent on REVOKED (spec.md §4.B: "revokeConsent ... idempotent on REVOKED").
    pub async fn revoke(&self, id: Uuid, actor: &str, reason: &str) -> AppResult<ConsentRequest> {
        let _guard = self.consent_locks.lock(id).await;
        let request = self.get_status(id).await?;

        if request.status == ConsentStatus::Revoked {
            return Ok(request);
        }
        if request.status != ConsentStatus::Granted {
            return Err(AppError::Conflict(format!(
                "cannot revoke consent {id} in status {}",
                request.status
            )));
        }

        if let Some(artifact) = self.get_active_artifact(id).await? {
            self.set_artifact_status(artifact.id, ArtifactStatus::Revoked)
                .await?;
        }
        self.set_status(id, ConsentStatus::Revoked, None).await?;
        self.audit
            .record_consent_event(
                id,
                ConsentAuditEventKind::Revoked,
                actor,
                serde_json::json!({ "reason": reason }),
            )
            .await
            .context("failed to record REVOKED audit event")?;

        self.get_status(id).await
    }

    /// Reconciles an inbound ABDM consent callback against the state
    /// transition table (spec.md §4.B). Always returns `Ok` for
    /// well-formed, non-backpressure cases: unknown ids, duplicates and
    /// post-terminal deliveries are no-ops logged as such, never errors.
    pub async fn ingest_callback(&self, payload: ConsentCallbackPayload) -> AppResult<()> {
        let request = match self
            .find_by_abdm_id(payload.abdm_request_id)
            .await?
        {
            Some(r) => r,
            None => {
                tracing::warn!(abdm_request_id = %payload.abdm_request_id, "consent callback for unknown abdmRequestId");
                return Ok(());
            }
        };

        let _guard = self.consent_locks.lock(request.id).await;

        if self.is_duplicate(payload.abdm_request_id, payload.seq).await? {
            tracing::info!(consent_request_id = %request.id, seq = payload.seq, "duplicate consent callback, ignoring");
            return Ok(());
        }

        self.audit
            .record_consent_event(
                request.id,
                ConsentAuditEventKind::CallbackReceived,
                "abdm",
                serde_json::json!({ "event": payload.event, "seq": payload.seq }),
            )
            .await
            .context("failed to record CALLBACK_RECEIVED audit event")?;

        if request.status.is_terminal() {
            self.audit
                .record_consent_event(
                    request.id,
                    ConsentAuditEventKind::CallbackAfterTerminal,
                    "abdm",
                    serde_json::json!({ "event": payload.event }),
                )
                .await
                .context("failed to record CALLBACK_AFTER_TERMINAL audit event")?;
            return Ok(());
        }

        let target_status = match payload.event.as_str() {
            "GRANTED" => Some(ConsentStatus::Granted),
            "DENIED" => Some(ConsentStatus::Denied),
            "EXPIRED" => Some(ConsentStatus::Expired),
            "REVOKED" => Some(ConsentStatus::Revoked),
            _ => None,
        };

        match target_status {
            Some(ConsentStatus::Granted) if request.can_transition_to(ConsentStatus::Granted) => {
                self.handle_granted(&request, payload.artifact).await?;
            }
            Some(ConsentStatus::Denied) if request.can_transition_to(ConsentStatus::Denied) => {
                self.set_status(request.id, ConsentStatus::Denied, None).await?;
                self.audit
                    .record_consent_event(request.id, ConsentAuditEventKind::Denied, "abdm", serde_json::json!({}))
                    .await
                    .context("failed to record DENIED audit event")?;
            }
            Some(ConsentStatus::Expired) if request.can_transition_to(ConsentStatus::Expired) => {
                if request.status == ConsentStatus::Granted {
                    if let Some(artifact) = self.get_active_artifact(request.id).await? {
                        self.set_artifact_status(artifact.id, ArtifactStatus::Expired).await?;
                    }
                }
                self.set_status(request.id, ConsentStatus::Expired, None).await?;
                self.audit
                    .record_consent_event(request.id, ConsentAuditEventKind::Expired, "abdm", serde_json::json!({}))
                    .await
                    .context("failed to record EXPIRED audit event")?;
            }
            Some(ConsentStatus::Revoked) if request.can_transition_to(ConsentStatus::Revoked) => {
                if let Some(artifact) = self.get_active_artifact(request.id).await? {
                    self.set_artifact_status(artifact.id, ArtifactStatus::Revoked).await?;
                }
                self.set_status(request.id, ConsentStatus::Revoked, None).await?;
                self.audit
                    .record_consent_event(request.id, ConsentAuditEventKind::Revoked, "abdm", serde_json::json!({}))
                    .await
                    .context("failed to record REVOKED audit event")?;
            }
            _ => {
                tracing::warn!(
                    consent_request_id = %request.id,
                    status = ?request.status,
                    event = %payload.event,
                    "unhandled or illegal consent callback transition"
                );
            }
        }

        Ok(())
    }

    async fn handle_granted(&self, request: &ConsentRequest, artifact: Option<ArtifactPayload>) -> AppResult<()> {
        let Some(artifact) = artifact else {
            return Err(AppError::Validation("GRANTED callback missing artifact".into()));
        };

        if let Err(e) = verify_artifact_signature(&artifact, &self.gateway_public_key) {
            self.set_status(request.id, ConsentStatus::Error, Some(ErrorRecoverability::Fatal))
                .await?;
            self.audit
                .record_consent_event(
                    request.id,
                    ConsentAuditEventKind::Error,
                    "system",
                    serde_json::json!({ "reason": e.to_string() }),
                )
                .await
                .context("failed to record ERROR audit event")?;
            return Ok(());
        }

        if let Err(reason) = validate_artifact(request, &artifact) {
            self.set_status(request.id, ConsentStatus::Error, Some(ErrorRecoverability::Fatal))
                .await?;
            self.audit
                .record_consent_event(
                    request.id,
                    ConsentAuditEventKind::Error,
                    "system",
                    serde_json::json!({ "reason": reason }),
                )
                .await
                .context("failed to record ERROR audit event")?;
            return Ok(());
        }

        let mut tx = self.pool.begin().await.context("failed to start artifact transaction")?;

        let permission = ConsentPermission {
            access_mode: artifact.access_mode.clone(),
            hi_types: artifact.hi_types.clone(),
            date_range_from: artifact.date_range_from,
            date_range_to: artifact.date_range_to,
            data_erase_at: artifact.data_erase_at,
        };
        let new_artifact = ConsentArtifact::new(
            request.id,
            artifact.abdm_artifact_id.clone(),
            permission,
            artifact.signed_payload.clone(),
            artifact.key_material.clone(),
            Utc::now(),
            artifact.data_erase_at,
        );

        sqlx::query(INSERT_CONSENT_ARTIFACT)
            .bind(new_artifact.id)
            .bind(new_artifact.consent_request_id)
            .bind(&new_artifact.abdm_artifact_id)
            .bind(Json(&new_artifact.permission))
            .bind(&new_artifact.signed_payload)
            .bind(&new_artifact.key_material)
            .bind(new_artifact.granted_at)
            .bind(new_artifact.expires_at)
            .bind(new_artifact.status.to_string())
            .execute(&mut *tx)
            .await
            .context("failed to insert consent artifact")?;

        sqlx::query(UPDATE_CONSENT_STATUS)
            .bind(request.id)
            .bind(ConsentStatus::Granted.to_string())
            .bind(Option::<String>::None)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .context("failed to update consent status to GRANTED")?;

        tx.commit().await.context("failed to commit artifact transaction")?;

        self.audit
            .record_consent_event(request.id, ConsentAuditEventKind::Granted, "abdm", serde_json::json!({}))
            .await
            .context("failed to record GRANTED audit event")?;
        Ok(())
    }

    async fn is_duplicate(&self, abdm_request_id: Uuid, seq: i64) -> AppResult<bool> {
        let result = sqlx::query(INSERT_CONSENT_CALLBACK_DEDUP)
            .bind(abdm_request_id)
            .bind(seq)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to record callback dedup entry")?;
        Ok(result.rows_affected() == 0)
    }

    async fn insert(&self, request: &ConsentRequest) -> AppResult<()> {
        sqlx::query(INSERT_CONSENT_REQUEST)
            .bind(request.id)
            .bind(request.patient_id)
            .bind(&request.patient_abha_id)
            .bind(request.requester_id)
            .bind(&request.purpose_code)
            .bind(&request.purpose_text)
            .bind(Json(&request.hi_types))
            .bind(request.date_range_from)
            .bind(request.date_range_to)
            .bind(request.expires_at)
            .bind(&request.hips)
            .bind(request.abdm_request_id)
            .bind(request.status.to_string())
            .bind(request.error_recoverability.map(|r| match r {
                ErrorRecoverability::Recoverable => "recoverable".to_string(),
                ErrorRecoverability::Fatal => "fatal".to_string(),
            }))
            .bind(request.created_at)
            .bind(request.updated_at)
            .execute(&self.pool)
            .await
            .context("failed to insert consent request")?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<ConsentRequest>> {
        let row = sqlx::query(GET_CONSENT_REQUEST_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch consent request")?;
        Ok(row.map(row_to_consent_request))
    }

    async fn find_by_abdm_id(&self, abdm_request_id: Uuid) -> AppResult<Option<ConsentRequest>> {
        let row = sqlx::query(GET_CONSENT_REQUEST_BY_ABDM_ID)
            .bind(abdm_request_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch consent request by abdmRequestId")?;
        Ok(row.map(row_to_consent_request))
    }

    async fn set_abdm_request_id(&self, id: Uuid, abdm_request_id: Uuid) -> AppResult<()> {
        sqlx::query(SET_CONSENT_ABDM_REQUEST_ID)
            .bind(id)
            .bind(abdm_request_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to set abdmRequestId")?;
        Ok(())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ConsentStatus,
        recoverability: Option<ErrorRecoverability>,
    ) -> AppResult<()> {
        sqlx::query(UPDATE_CONSENT_STATUS)
            .bind(id)
            .bind(status.to_string())
            .bind(recoverability.map(|r| match r {
                ErrorRecoverability::Recoverable => "recoverable".to_string(),
                ErrorRecoverability::Fatal => "fatal".to_string(),
            }))
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to update consent status")?;
        Ok(())
    }

    async fn set_artifact_status(&self, id: Uuid, status: ArtifactStatus) -> AppResult<()> {
        sqlx::query(UPDATE_ARTIFACT_STATUS)
            .bind(id)
            .bind(status.to_string())
            .execute(&self.pool)
            .await
            .context("failed to update artifact status")?;
        Ok(())
    }

    /// Consent requests still REQUESTED past their `expiresAt` (spec.md §4.B,
    /// background expiry scan).
    pub async fn list_expired_requests(&self, now: chrono::DateTime<Utc>) -> AppResult<Vec<ConsentRequest>> {
        let rows = sqlx::query(LIST_EXPIRED_CONSENT_REQUESTS)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .context("failed to list expired consent requests")?;
        Ok(rows.into_iter().map(row_to_consent_request).collect())
    }

    /// ACTIVE artifacts past their `expiresAt` (spec.md §4.B).
    pub async fn list_expired_active_artifacts(&self, now: chrono::DateTime<Utc>) -> AppResult<Vec<ConsentArtifact>> {
        let rows = sqlx::query(LIST_EXPIRED_ACTIVE_ARTIFACTS)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .context("failed to list expired active artifacts")?;
        Ok(rows.into_iter().map(row_to_artifact).collect())
    }

    /// Transitions a still-REQUESTED consent past its window to EXPIRED.
    pub async fn expire_request(&self, id: Uuid) -> AppResult<()> {
        let _guard = self.consent_locks.lock(id).await;
        self.set_status(id, ConsentStatus::Expired, None).await?;
        self.audit
            .record_consent_event(
                id,
                ConsentAuditEventKind::Expired,
                "system",
                serde_json::json!({ "reason": "requested consent expired before a decision was received" }),
            )
            .await
            .context("failed to record EXPIRED audit event")?;
        Ok(())
    }

    /// Transitions an ACTIVE artifact (and its owning consent) past their
    /// grant window to EXPIRED.
    pub async fn expire_artifact(&self, artifact_id: Uuid, consent_request_id: Uuid) -> AppResult<()> {
        let _guard = self.consent_locks.lock(consent_request_id).await;
        self.set_artifact_status(artifact_id, ArtifactStatus::Expired).await?;
        self.set_status(consent_request_id, ConsentStatus::Expired, None).await?;
        self.audit
            .record_consent_event(
                consent_request_id,
                ConsentAuditEventKind::Expired,
                "system",
                serde_json::json!({ "reason": "consent artifact expired" }),
            )
            .await
            .context("failed to record EXPIRED audit event")?;
        Ok(())
    }
}

/// §4.B artifact validation on GRANTED: permission fields non-empty,
/// dataEraseAt in the future, hiTypes subset of the request's, date window
/// inside the requested window.
fn validate_artifact(request: &ConsentRequest, artifact: &ArtifactPayload) -> Result<(), String> {
    if artifact.access_mode.trim().is_empty() {
        return Err("artifact accessMode is empty".into());
    }
    if artifact.hi_types.is_empty() {
        return Err("artifact hiTypes is empty".into());
    }
    if artifact.data_erase_at <= Utc::now() {
        return Err("artifact dataEraseAt is not in the future".into());
    }
    let hi_types: HashSet<HiType> = artifact.hi_types.clone();
    if !hi_types.is_subset(&request.hi_types) {
        return Err("artifact hiTypes is not a subset of the requested hiTypes".into());
    }
    if artifact.date_range_from < request.date_range_from || artifact.date_range_to > request.date_range_to {
        return Err("artifact date range is outside the requested window".into());
    }
    Ok(())
}

fn row_to_consent_request(row: sqlx::postgres::PgRow) -> ConsentRequest {
    let hi_types: Json<HashSet<HiType>> = row.get("hi_types");
    ConsentRequest {
        id: row.get("id"),
        patient_id: row.get("patient_id"),
        patient_abha_id: row.get("patient_abha_id"),
        requester_id: row.get("requester_id"),
        purpose_code: row.get("purpose_code"),
        purpose_text: row.get("purpose_text"),
        hi_types: hi_types.0,
        date_range_from: row.get("date_range_from"),
        date_range_to: row.get("date_range_to"),
        expires_at: row.get("expires_at"),
        hips: row.get("hips"),
        abdm_request_id: row.get("abdm_request_id"),
        status: parse_consent_status(&row.get::<String, _>("status")),
        error_recoverability: row
            .get::<Option<String>, _>("error_recoverability")
            .map(|s| parse_error_recoverability(&s)),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_artifact(row: sqlx::postgres::PgRow) -> ConsentArtifact {
    let permission: Json<ConsentPermission> = row.get("permission");
    ConsentArtifact {
        id: row.get("id"),
        consent_request_id: row.get("consent_request_id"),
        abdm_artifact_id: row.get("abdm_artifact_id"),
        permission: permission.0,
        signed_payload: row.get("signed_payload"),
        key_material: row.get("key_material"),
        granted_at: row.get("granted_at"),
        expires_at: row.get("expires_at"),
        status: parse_artifact_status(&row.get::<String, _>("status")),
    }
}

fn parse_consent_status(s: &str) -> ConsentStatus {
    match s {
        "REQUESTED" => ConsentStatus::Requested,
        "GRANTED" => ConsentStatus::Granted,
        "DENIED" => ConsentStatus::Denied,
        "EXPIRED" => ConsentStatus::Expired,
        "REVOKED" => ConsentStatus::Revoked,
        "ERROR" => ConsentStatus::Error,
        other => panic!("unknown consent status in storage: {other}"),
    }
}

fn parse_error_recoverability(s: &str) -> ErrorRecoverability {
    match s {
        "recoverable" => ErrorRecoverability::Recoverable,
        "fatal" => ErrorRecoverability::Fatal,
        other => panic!("unknown error recoverability in storage: {other}"),
    }
}

fn parse_artifact_status(s: &str) -> ArtifactStatus {
    match s {
        "ACTIVE" => ArtifactStatus::Active,
        "EXPIRED" => ArtifactStatus::Expired,
        "REVOKED" => ArtifactStatus::Revoked,
        other => panic!("unknown artifact status in storage: {other}"),
    }
}
