use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

use crate::core::errors::AppResult;
use crate::hifetch::hifetch_service::{HiFetchOrchestrator, IngestOutcome};
use crate::hifetch::hifetch_types::HealthRecordsCallbackPayload;
use crate::models::constants::HI_FETCH_BACKPRESSURE_RETRY_AFTER_SECS;

pub struct HiFetchWebhook {
    service: Arc<HiFetchOrchestrator>,
}

impl HiFetchWebhook {
    pub fn new(service: Arc<HiFetchOrchestrator>) -> Self {
        Self { service }
    }

    pub fn routes(&self) -> Router {
        Router::new()
            .route("/health-records/callback", post(Self::callback))
            .with_state(self.service.clone())
    }

    /// Queue-full is the one failure mode this crate surfaces as a plain
    /// HTTP response rather than through [`AppError`]: it isn't a request
    /// error, it's the caller being asked to retry shortly (spec.md §5).
    async fn callback(
        State(service): State<Arc<HiFetchOrchestrator>>,
        Json(payload): Json<HealthRecordsCallbackPayload>,
    ) -> AppResult<Response> {
        match service.ingest_records(payload).await? {
            IngestOutcome::Accepted => Ok(Json(serde_json::json!({ "success": true })).into_response()),
            IngestOutcome::Backpressure => Ok((
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, HI_FETCH_BACKPRESSURE_RETRY_AFTER_SECS.to_string())],
                Json(serde_json::json!({ "success": false, "error": "processing queue is full" })),
            )
                .into_response()),
        }
    }
}
