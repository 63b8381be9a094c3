//! HI Fetch Orchestrator (spec.md §4.C, §5): initiates health-information
//! fetches against a granted consent artifact and drains inbound record
//! batches through a bounded worker pool.

#[path = "hifetch.controller.rs"]
pub mod hifetch_controller;
#[path = "hifetch.service.rs"]
pub mod hifetch_service;
#[path = "hifetch.sql.rs"]
pub mod hifetch_sql;
#[path = "hifetch.types.rs"]
pub mod hifetch_types;
#[path = "hifetch.webhook.rs"]
pub mod hifetch_webhook;
#[path = "hifetch.worker.rs"]
pub mod hifetch_worker;

pub use hifetch_controller::HiFetchController;
pub use hifetch_service::HiFetchOrchestrator;
pub use hifetch_webhook::HiFetchWebhook;
pub use hifetch_worker::HiFetchWorkerPool;

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use crate::audit::AuditService;
use crate::consent::ConsentOrchestrator;
use crate::core::keyed_lock::KeyedLock;
use crate::gateway::GatewayClient;
use crate::records::RecordStore;

pub struct HiFetchModule {
    pub service: Arc<HiFetchOrchestrator>,
    controller: Arc<HiFetchController>,
    webhook: Arc<HiFetchWebhook>,
}

impl HiFetchModule {
    pub fn new(
        pool: PgPool,
        gateway: Arc<GatewayClient>,
        audit: Arc<AuditService>,
        consent: Arc<ConsentOrchestrator>,
        records: Arc<RecordStore>,
        callback_url: String,
    ) -> Self {
        let fetch_locks = Arc::new(KeyedLock::new());
        let workers = Arc::new(HiFetchWorkerPool::spawn(pool.clone(), records, audit.clone(), fetch_locks.clone()));
        let service = Arc::new(HiFetchOrchestrator::new(
            pool,
            gateway,
            audit,
            consent,
            callback_url,
            fetch_locks,
            workers,
        ));
        Self {
            controller: Arc::new(HiFetchController::new(service.clone())),
            webhook: Arc::new(HiFetchWebhook::new(service.clone())),
            service,
        }
    }

    pub fn service(&self) -> Arc<HiFetchOrchestrator> {
        self.service.clone()
    }

    pub fn routes(&self) -> Router {
        self.controller.routes()
    }

    pub fn webhook_routes(&self) -> Router {
        self.webhook.routes()
    }
}
