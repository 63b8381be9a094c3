use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::types::HiType;

/// Body POSTed to the gateway to initiate a health-information fetch
/// (spec.md §4.C). `abdm_request_id` is minted locally so callbacks can be
/// correlated back to this fetch before the gateway ever acknowledges it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HiRequestInitPayload {
    pub abdm_request_id: Uuid,
    pub consent_artifact_id: String,
    pub hi_types: Vec<HiType>,
    pub date_range_from: DateTime<Utc>,
    pub date_range_to: DateTime<Utc>,
    pub callback_url: String,
}

/// Body of `POST /health-records/fetch` (spec.md §6.1).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateFetchPayload {
    pub consent_request_id: Uuid,
    pub patient_id: Uuid,
    #[serde(default)]
    pub hi_types: Option<HashSet<HiType>>,
    #[serde(default)]
    pub date_range_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_range_to: Option<DateTime<Utc>>,
}

/// One record as delivered in a health-information callback (spec.md §4.C,
/// §6.2). `content` is the encrypted FHIR bundle, base64-encoded with a
/// 12-byte AES-GCM nonce prefix; `checksum` is the declared SHA-256 of the
/// canonicalized plaintext.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiRecordPayload {
    pub care_context_reference: String,
    pub content: String,
    pub checksum: String,
    pub record_date: DateTime<Utc>,
    pub record_type: String,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub provider_type: Option<String>,
}

/// Body ABDM posts to `/api/abdm/health-records/callback` (spec.md §6.2).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecordsCallbackPayload {
    pub abdm_request_id: Uuid,
    pub records: Vec<HiRecordPayload>,
    pub end_of_stream: bool,
    #[serde(default)]
    pub total_records: Option<u32>,
    pub seq: i64,
}
