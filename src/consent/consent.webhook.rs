use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

use crate::consent::consent_service::ConsentOrchestrator;
use crate::consent::consent_types::ConsentCallbackPayload;
use crate::core::errors::AppResult;

/// Public ABDM-facing webhook surface (spec.md §6.2). Always returns 2xx
/// except for malformed bodies (handled by `Json`'s own 400 rejection) or
/// backpressure, to discourage ABDM from retrying a delivery we already
/// accepted.
pub struct ConsentWebhook {
    service: Arc<ConsentOrchestrator>,
}

impl ConsentWebhook {
    pub fn new(service: Arc<ConsentOrchestrator>) -> Self {
        Self { service }
    }

    pub fn routes(&self) -> Router {
        Router::new()
            .route("/consent/callback", post(Self::callback))
            .with_state(self.service.clone())
    }

    async fn callback(
        State(service): State<Arc<ConsentOrchestrator>>,
        Json(payload): Json<ConsentCallbackPayload>,
    ) -> AppResult<Json<serde_json::Value>> {
        service.ingest_callback(payload).await?;
        Ok(Json(serde_json::json!({ "success": true })))
    }
}
