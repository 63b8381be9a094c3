use axum::{
    extract::{Extension, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::audit_service::AuditService;
use crate::auth::{require_owner_or_admin, AuthenticatedUser};
use crate::consent::ConsentOrchestrator;
use crate::core::errors::{AppError, AppResult};
use crate::hifetch::HiFetchOrchestrator;
use crate::models::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::models::types::UserRole;
use crate::records::RecordStore;

/// Every route here reads data scoped to a patient, a consent, or a fetch —
/// all of it owned by whichever doctor requested it — so every handler
/// needs the owning services to authorize before returning anything.
#[derive(Clone)]
struct AuditState {
    audit: Arc<AuditService>,
    consent: Arc<ConsentOrchestrator>,
    hifetch: Arc<HiFetchOrchestrator>,
    records: Arc<RecordStore>,
}

pub struct AuditController {
    state: AuditState,
}

#[derive(Debug, Deserialize)]
pub struct AccessLogQuery {
    pub health_record_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl AuditController {
    pub fn new(
        audit: Arc<AuditService>,
        consent: Arc<ConsentOrchestrator>,
        hifetch: Arc<HiFetchOrchestrator>,
        records: Arc<RecordStore>,
    ) -> Self {
        Self {
            state: AuditState { audit, consent, hifetch, records },
        }
    }

    pub fn routes(&self) -> Router {
        Router::new()
            .route("/consent/:id/events", get(Self::consent_events))
            .route("/consent/:id/verify", get(Self::verify_consent_chain))
            .route("/fetch/:id/processing-logs", get(Self::processing_logs))
            .route("/access-logs", get(Self::access_logs))
            .with_state(self.state.clone())
    }

    async fn consent_events(
        State(state): State<AuditState>,
        Extension(user): Extension<AuthenticatedUser>,
        Path(id): Path<Uuid>,
    ) -> AppResult<Json<serde_json::Value>> {
        let request = state.consent.get_status(id).await?;
        require_owner_or_admin(&user, request.requester_id)?;

        let events = state.audit.list_consent_events(id).await?;
        Ok(Json(serde_json::json!({ "success": true, "data": events })))
    }

    async fn verify_consent_chain(
        State(state): State<AuditState>,
        Extension(user): Extension<AuthenticatedUser>,
        Path(id): Path<Uuid>,
    ) -> AppResult<Json<serde_json::Value>> {
        let request = state.consent.get_status(id).await?;
        require_owner_or_admin(&user, request.requester_id)?;

        let intact = state.audit.verify_consent_chain(id).await?;
        Ok(Json(serde_json::json!({ "success": true, "data": { "chainIntact": intact } })))
    }

    async fn processing_logs(
        State(state): State<AuditState>,
        Extension(user): Extension<AuthenticatedUser>,
        Path(id): Path<Uuid>,
    ) -> AppResult<Json<serde_json::Value>> {
        let fetch = state.hifetch.get_status(id).await?;
        require_owner_or_admin(&user, fetch.doctor_id)?;

        let logs = state.audit.list_processing_logs(id).await?;
        Ok(Json(serde_json::json!({ "success": true, "data": logs })))
    }

    async fn access_logs(
        State(state): State<AuditState>,
        Extension(user): Extension<AuthenticatedUser>,
        Query(params): Query<AccessLogQuery>,
    ) -> AppResult<Json<serde_json::Value>> {
        let limit = params
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE) as i64;
        let offset = params.offset.unwrap_or(0) as i64;

        let logs = match (params.health_record_id, params.user_id) {
            (Some(record_id), _) => {
                let record = state
                    .records
                    .find(record_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("health record {record_id} not found")))?;
                match record.fetch_request_id {
                    Some(fetch_request_id) => {
                        let fetch = state.hifetch.get_status(fetch_request_id).await?;
                        require_owner_or_admin(&user, fetch.doctor_id)?;
                    }
                    None if user.role == UserRole::Admin => {}
                    None => {
                        return Err(AppError::Unauthorized(
                            "access logs for this record are admin-only".into(),
                        ))
                    }
                }
                state.audit.list_access_by_record(record_id, limit, offset).await?
            }
            (None, Some(user_id)) => {
                require_owner_or_admin(&user, user_id)?;
                state.audit.list_access_by_user(user_id, limit, offset).await?
            }
            (None, None) => {
                return Err(AppError::Validation(
                    "one of healthRecordId or userId is required".into(),
                ))
            }
        };

        Ok(Json(serde_json::json!({ "success": true, "data": logs })))
    }
}
