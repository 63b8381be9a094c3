use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::types::ConsentAuditEventKind;

/// Append-only consent lifecycle event (spec.md §3, §8 invariant 5).
///
/// `chain_hash` links each event to the previous one for the same
/// `consent_request_id`, giving a tamper-evident trail — see
/// `audit::hash_chain` and DESIGN.md.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentAuditEvent {
    pub id: Uuid,
    pub consent_request_id: Uuid,
    pub event: ConsentAuditEventKind,
    pub actor: String,
    pub details: serde_json::Value,
    pub at: DateTime<Utc>,
    pub previous_hash: String,
    pub chain_hash: String,
}
