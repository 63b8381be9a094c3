//! Regulatory audit trail: chained consent lifecycle events, HI record
//! processing logs, and patient-data access logs (spec.md §3, §7, §8).

pub mod chain;

#[path = "audit.controller.rs"]
pub mod audit_controller;
#[path = "audit.service.rs"]
pub mod audit_service;
#[path = "audit.sql.rs"]
pub mod audit_sql;

pub use audit_controller::AuditController;
pub use audit_service::AuditService;

use sqlx::PgPool;
use std::sync::Arc;

/// Only the service is built here: [`AuditController`] also authorizes
/// against consent and hi-fetch ownership, both of which are constructed
/// after this module, so its routes are assembled once those exist (see
/// `bin/server.rs`).
pub struct AuditModule {
    pub service: Arc<AuditService>,
}

impl AuditModule {
    pub fn new(db_pool: PgPool) -> Self {
        Self {
            service: Arc::new(AuditService::new(db_pool)),
        }
    }

    pub fn service(&self) -> Arc<AuditService> {
        self.service.clone()
    }
}
