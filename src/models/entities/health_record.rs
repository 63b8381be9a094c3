use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::types::RecordSource;
use crate::models::RecordStatus;

/// One FHIR resource as ingested (spec.md §3). `fhir_resource` is stored as
/// opaque JSON; this crate validates structural shape only, never semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub fetch_request_id: Option<Uuid>,
    pub abdm_record_id: Option<String>,
    pub record_type: String,
    pub record_date: DateTime<Utc>,
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    pub provider_type: Option<String>,
    pub fhir_resource: serde_json::Value,
    pub checksum: String,
    pub source: RecordSource,
    pub status: RecordStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

impl HealthRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        patient_id: Uuid,
        fetch_request_id: Option<Uuid>,
        abdm_record_id: Option<String>,
        record_type: String,
        record_date: DateTime<Utc>,
        provider_id: Option<String>,
        provider_name: Option<String>,
        provider_type: Option<String>,
        fhir_resource: serde_json::Value,
        checksum: String,
        source: RecordSource,
        version: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            fetch_request_id,
            abdm_record_id,
            record_type,
            record_date,
            provider_id,
            provider_name,
            provider_type,
            fhir_resource,
            checksum,
            source,
            status: RecordStatus::Active,
            version,
            created_at: Utc::now(),
        }
    }
}
