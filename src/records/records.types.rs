use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::types::RecordSource;

/// Query params for `GET /health-records/patient/:patientId` (spec.md §6.1).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindRecordsFilters {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub source: Option<RecordSource>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Caller/request context used for access logging (spec.md §4.D).
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub user_id: Uuid,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}
