use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::types::{ProcessingOutcome, ProcessingStage};

/// Per-record processing event emitted at each pipeline stage (spec.md §3, §4.C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingLog {
    pub id: Uuid,
    pub fetch_request_id: Uuid,
    pub health_record_id: Option<Uuid>,
    pub abdm_record_id: Option<String>,
    pub stage: ProcessingStage,
    pub outcome: ProcessingOutcome,
    pub processing_time_ms: u64,
    pub details: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl ProcessingLog {
    pub fn new(
        fetch_request_id: Uuid,
        abdm_record_id: Option<String>,
        stage: ProcessingStage,
        outcome: ProcessingOutcome,
        processing_time_ms: u64,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fetch_request_id,
            health_record_id: None,
            abdm_record_id,
            stage,
            outcome,
            processing_time_ms,
            details,
            at: Utc::now(),
        }
    }

    pub fn with_health_record(mut self, id: Uuid) -> Self {
        self.health_record_id = Some(id);
        self
    }
}
