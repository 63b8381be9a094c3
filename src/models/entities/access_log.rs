use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::types::AccessType;

/// Who read what, when (spec.md §3, §4.D "Access logging").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLog {
    pub id: Uuid,
    pub health_record_id: Uuid,
    pub user_id: Uuid,
    pub access_type: AccessType,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub at: DateTime<Utc>,
}

impl AccessLog {
    pub fn new(
        health_record_id: Uuid,
        user_id: Uuid,
        access_type: AccessType,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            health_record_id,
            user_id,
            access_type,
            ip,
            user_agent,
            at: Utc::now(),
        }
    }
}
