//! Record Store & Integrity Layer (spec.md §4.D): canonicalized-JSON
//! checksums, supersede-on-conflict versioning, and access logging.

pub mod canonical;
#[path = "records.controller.rs"]
pub mod records_controller;
#[path = "records.service.rs"]
pub mod records_service;
#[path = "records.sql.rs"]
pub mod records_sql;
#[path = "records.types.rs"]
pub mod records_types;

pub use records_controller::RecordsController;
pub use records_service::RecordStore;
pub use records_types::AccessContext;

use std::sync::Arc;

use sqlx::PgPool;

use crate::audit::AuditService;

/// Only the store is built here: [`RecordsController`] also authorizes
/// against consent and hi-fetch ownership, both of which are constructed
/// after this module, so its routes are assembled once those exist (see
/// `bin/server.rs`).
pub struct RecordsModule {
    pub service: Arc<RecordStore>,
}

impl RecordsModule {
    pub fn new(pool: PgPool, audit: Arc<AuditService>) -> Self {
        Self {
            service: Arc::new(RecordStore::new(pool, audit)),
        }
    }

    pub fn service(&self) -> Arc<RecordStore> {
        self.service.clone()
    }
}
