use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::types::HiType;

/// Body of `POST /consent/request` (spec.md §6.1).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConsentPayload {
    pub patient_id: Uuid,
    pub patient_abha_id: String,
    pub requester_id: Uuid,
    pub purpose_code: String,
    pub purpose_text: String,
    pub hi_types: HashSet<HiType>,
    pub date_range_from: DateTime<Utc>,
    pub date_range_to: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub hips: Option<Vec<String>>,
}

/// Body of `POST /consent/:id/revoke` (spec.md §6.1, §6.4: reason 10..500 chars).
#[derive(Debug, Deserialize)]
pub struct RevokeConsentPayload {
    pub reason: String,
}

/// Body posted to the gateway's consent-init endpoint (spec.md §6.3),
/// which acknowledges with `{abdmRequestId}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentInitPayload {
    pub patient_abha_id: String,
    pub purpose_code: String,
    pub purpose_text: String,
    pub hi_types: Vec<HiType>,
    pub date_range_from: DateTime<Utc>,
    pub date_range_to: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub callback_url: String,
}

/// The permission object as it arrives inside a GRANTED callback (spec.md §4.B).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPayload {
    pub abdm_artifact_id: String,
    pub access_mode: String,
    pub hi_types: HashSet<HiType>,
    pub date_range_from: DateTime<Utc>,
    pub date_range_to: DateTime<Utc>,
    pub data_erase_at: DateTime<Utc>,
    pub signed_payload: String,
    pub key_material: Option<String>,
}

/// Body ABDM posts to `/api/abdm/consent/callback` (spec.md §6.2).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentCallbackPayload {
    pub abdm_request_id: Uuid,
    pub event: String,
    #[serde(default)]
    pub artifact: Option<ArtifactPayload>,
    pub at: DateTime<Utc>,
    pub seq: i64,
}
