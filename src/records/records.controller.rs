use axum::extract::{ConnectInfo, Extension, Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{require_owner_or_admin, AuthenticatedUser};
use crate::consent::ConsentOrchestrator;
use crate::core::errors::{AppError, AppResult};
use crate::hifetch::HiFetchOrchestrator;
use crate::models::types::UserRole;
use crate::models::HealthRecord;
use crate::records::records_service::RecordStore;
use crate::records::records_types::{AccessContext, FindRecordsFilters};

/// Dependencies the controller needs to authorize access against a record's
/// owning fetch request or consent, beyond the record store itself.
#[derive(Clone)]
struct RecordsState {
    records: Arc<RecordStore>,
    consent: Arc<ConsentOrchestrator>,
    hifetch: Arc<HiFetchOrchestrator>,
}

pub struct RecordsController {
    state: RecordsState,
}

impl RecordsController {
    pub fn new(records: Arc<RecordStore>, consent: Arc<ConsentOrchestrator>, hifetch: Arc<HiFetchOrchestrator>) -> Self {
        Self {
            state: RecordsState { records, consent, hifetch },
        }
    }

    pub fn routes(&self) -> Router {
        Router::new()
            .route("/health-records/patient/:patientId", get(Self::find_by_patient))
            .route("/health-records/:recordId", get(Self::get))
            .with_state(self.state.clone())
    }

    async fn find_by_patient(
        State(state): State<RecordsState>,
        Extension(user): Extension<AuthenticatedUser>,
        Path(patient_id): Path<Uuid>,
        Query(filters): Query<FindRecordsFilters>,
    ) -> AppResult<Json<serde_json::Value>> {
        authorize_patient_access(&user, patient_id, &state.consent).await?;
        let records = state.records.find_by_patient(patient_id, &filters).await?;
        Ok(Json(serde_json::json!({ "success": true, "data": records })))
    }

    async fn get(
        State(state): State<RecordsState>,
        Extension(user): Extension<AuthenticatedUser>,
        Path(record_id): Path<Uuid>,
        ConnectInfo(addr): ConnectInfo<SocketAddr>,
        headers: HeaderMap,
    ) -> AppResult<Json<serde_json::Value>> {
        let record = state
            .records
            .find(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("health record {record_id} not found")))?;
        authorize_record_access(&user, &record, &state.consent, &state.hifetch).await?;

        let ctx = AccessContext {
            user_id: user.user_id,
            ip: Some(addr.ip().to_string()),
            user_agent: headers
                .get(axum::http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        };
        let record = state.records.get(record_id, &ctx).await?;
        Ok(Json(serde_json::json!({ "success": true, "data": record })))
    }
}

/// A doctor may read a patient's records only if they hold (or held) a
/// consent request for that patient; admins bypass the check. Mirrors the
/// ownership rule applied to consent and hi-fetch resources.
async fn authorize_patient_access(
    user: &AuthenticatedUser,
    patient_id: Uuid,
    consent: &Arc<ConsentOrchestrator>,
) -> AppResult<()> {
    if user.role == UserRole::Admin {
        return Ok(());
    }
    let consents = consent.list_active(patient_id).await?;
    if consents.iter().any(|c| c.requester_id == user.user_id) {
        return Ok(());
    }
    Err(AppError::Unauthorized(
        "doctors may only view patients they hold a consent request for".into(),
    ))
}

/// Resolves the record's owning doctor via its fetch request when one
/// exists, otherwise falls back to the patient-level consent check.
async fn authorize_record_access(
    user: &AuthenticatedUser,
    record: &HealthRecord,
    consent: &Arc<ConsentOrchestrator>,
    hifetch: &Arc<HiFetchOrchestrator>,
) -> AppResult<()> {
    if user.role == UserRole::Admin {
        return Ok(());
    }
    if let Some(fetch_request_id) = record.fetch_request_id {
        let fetch = hifetch.get_status(fetch_request_id).await?;
        return require_owner_or_admin(user, fetch.doctor_id);
    }
    authorize_patient_access(user, record.patient_id, consent).await
}
