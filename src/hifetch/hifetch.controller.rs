use axum::extract::{Extension, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{require_owner_or_admin, AuthenticatedUser};
use crate::core::errors::AppResult;
use crate::hifetch::hifetch_service::HiFetchOrchestrator;
use crate::hifetch::hifetch_types::InitiateFetchPayload;

pub struct HiFetchController {
    service: Arc<HiFetchOrchestrator>,
}

impl HiFetchController {
    pub fn new(service: Arc<HiFetchOrchestrator>) -> Self {
        Self { service }
    }

    pub fn routes(&self) -> Router {
        Router::new()
            .route("/health-records/fetch", post(Self::initiate))
            .route("/health-records/status/:requestId", get(Self::status))
            .route("/health-records/status/:requestId/cancel", post(Self::cancel))
            .with_state(self.service.clone())
    }

    async fn initiate(
        State(service): State<Arc<HiFetchOrchestrator>>,
        Extension(user): Extension<AuthenticatedUser>,
        Json(payload): Json<InitiateFetchPayload>,
    ) -> AppResult<Json<serde_json::Value>> {
        let fetch = service.initiate_fetch(payload, user.user_id).await?;
        Ok(Json(serde_json::json!({ "success": true, "data": fetch })))
    }

    async fn status(
        State(service): State<Arc<HiFetchOrchestrator>>,
        Extension(user): Extension<AuthenticatedUser>,
        Path(request_id): Path<Uuid>,
    ) -> AppResult<Json<serde_json::Value>> {
        let fetch = service.get_status(request_id).await?;
        require_owner_or_admin(&user, fetch.doctor_id)?;
        Ok(Json(serde_json::json!({ "success": true, "data": fetch })))
    }

    async fn cancel(
        State(service): State<Arc<HiFetchOrchestrator>>,
        Extension(user): Extension<AuthenticatedUser>,
        Path(request_id): Path<Uuid>,
    ) -> AppResult<Json<serde_json::Value>> {
        let existing = service.get_status(request_id).await?;
        require_owner_or_admin(&user, existing.doctor_id)?;

        let fetch = service.cancel_fetch(request_id).await?;
        Ok(Json(serde_json::json!({ "success": true, "data": fetch })))
    }
}
