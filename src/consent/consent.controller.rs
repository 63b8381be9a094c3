use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{require_owner_or_admin, AuthenticatedUser};
use crate::consent::consent_service::ConsentOrchestrator;
use crate::consent::consent_types::{RequestConsentPayload, RevokeConsentPayload};
use crate::core::errors::{AppError, AppResult};
use crate::models::constants::{REASON_MAX_LENGTH, REASON_MIN_LENGTH};
use crate::models::types::UserRole;

pub struct ConsentController {
    service: Arc<ConsentOrchestrator>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveConsentsQuery {
    pub patient_id: Uuid,
}

impl ConsentController {
    pub fn new(service: Arc<ConsentOrchestrator>) -> Self {
        Self { service }
    }

    pub fn routes(&self) -> Router {
        Router::new()
            .route("/consent/request", post(Self::request_consent))
            .route("/consent/:id/status", get(Self::get_status))
            .route("/consent/active", get(Self::list_active))
            .route("/consent/:id/revoke", post(Self::revoke))
            .with_state(self.service.clone())
    }

    async fn request_consent(
        State(service): State<Arc<ConsentOrchestrator>>,
        Extension(user): Extension<AuthenticatedUser>,
        Json(payload): Json<RequestConsentPayload>,
    ) -> AppResult<Json<serde_json::Value>> {
        require_owner_or_admin(&user, payload.requester_id)?;
        let request = service.request_consent(payload, &user.user_id.to_string()).await?;
        Ok(Json(serde_json::json!({ "success": true, "data": request })))
    }

    async fn get_status(
        State(service): State<Arc<ConsentOrchestrator>>,
        Extension(user): Extension<AuthenticatedUser>,
        Path(id): Path<Uuid>,
    ) -> AppResult<Json<serde_json::Value>> {
        let request = service.get_status(id).await?;
        require_owner_or_admin(&user, request.requester_id)?;
        Ok(Json(serde_json::json!({ "success": true, "data": request })))
    }

    async fn list_active(
        State(service): State<Arc<ConsentOrchestrator>>,
        Extension(user): Extension<AuthenticatedUser>,
        Query(params): Query<ActiveConsentsQuery>,
    ) -> AppResult<Json<serde_json::Value>> {
        let mut consents = service.list_active(params.patient_id).await?;
        if user.role == UserRole::Doctor {
            consents.retain(|c| c.requester_id == user.user_id);
        }
        Ok(Json(serde_json::json!({ "success": true, "data": consents })))
    }

    async fn revoke(
        State(service): State<Arc<ConsentOrchestrator>>,
        Extension(user): Extension<AuthenticatedUser>,
        Path(id): Path<Uuid>,
        Json(payload): Json<RevokeConsentPayload>,
    ) -> AppResult<Json<serde_json::Value>> {
        if payload.reason.len() < REASON_MIN_LENGTH || payload.reason.len() > REASON_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "reason must be between {REASON_MIN_LENGTH} and {REASON_MAX_LENGTH} characters"
            )));
        }
        let existing = service.get_status(id).await?;
        require_owner_or_admin(&user, existing.requester_id)?;

        let request = service.revoke(id, &user.user_id.to_string(), &payload.reason).await?;
        Ok(Json(serde_json::json!({ "success": true, "data": request })))
    }
}
