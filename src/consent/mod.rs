//! Consent Orchestrator (spec.md §4.B): issues consent requests to the
//! ABDM gateway, reconciles callbacks, and tracks the one-artifact-per-
//! granted-consent invariant.

#[path = "consent.controller.rs"]
pub mod consent_controller;
#[path = "consent.service.rs"]
pub mod consent_service;
#[path = "consent.signature.rs"]
pub mod consent_signature;
#[path = "consent.sql.rs"]
pub mod consent_sql;
#[path = "consent.types.rs"]
pub mod consent_types;
#[path = "consent.webhook.rs"]
pub mod consent_webhook;

pub use consent_controller::ConsentController;
pub use consent_service::ConsentOrchestrator;
pub use consent_webhook::ConsentWebhook;

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use crate::audit::AuditService;
use crate::core::config::CallbackConfig;
use crate::gateway::GatewayClient;

pub struct ConsentModule {
    pub service: Arc<ConsentOrchestrator>,
    controller: Arc<ConsentController>,
    webhook: Arc<ConsentWebhook>,
}

impl ConsentModule {
    pub fn new(
        pool: PgPool,
        gateway: Arc<GatewayClient>,
        audit: Arc<AuditService>,
        callbacks: CallbackConfig,
        gateway_public_key: String,
    ) -> Self {
        let service = Arc::new(ConsentOrchestrator::new(pool, gateway, audit, callbacks, gateway_public_key));
        Self {
            controller: Arc::new(ConsentController::new(service.clone())),
            webhook: Arc::new(ConsentWebhook::new(service.clone())),
            service,
        }
    }

    pub fn service(&self) -> Arc<ConsentOrchestrator> {
        self.service.clone()
    }

    pub fn routes(&self) -> Router {
        self.controller.routes()
    }

    pub fn webhook_routes(&self) -> Router {
        self.webhook.routes()
    }
}
