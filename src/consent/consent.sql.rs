pub const INSERT_CONSENT_REQUEST: &str = r#"
INSERT INTO consent_requests (
    id, patient_id, patient_abha_id, requester_id, purpose_code, purpose_text,
    hi_types, date_range_from, date_range_to, expires_at, hips,
    abdm_request_id, status, error_recoverability, created_at, updated_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
"#;

pub const GET_CONSENT_REQUEST_BY_ID: &str = r#"
SELECT id, patient_id, patient_abha_id, requester_id, purpose_code, purpose_text,
       hi_types, date_range_from, date_range_to, expires_at, hips,
       abdm_request_id, status, error_recoverability, created_at, updated_at
FROM consent_requests WHERE id = $1
"#;

pub const GET_CONSENT_REQUEST_BY_ABDM_ID: &str = r#"
SELECT id, patient_id, patient_abha_id, requester_id, purpose_code, purpose_text,
       hi_types, date_range_from, date_range_to, expires_at, hips,
       abdm_request_id, status, error_recoverability, created_at, updated_at
FROM consent_requests WHERE abdm_request_id = $1
"#;

pub const LIST_ACTIVE_CONSENTS_BY_PATIENT: &str = r#"
SELECT id, patient_id, patient_abha_id, requester_id, purpose_code, purpose_text,
       hi_types, date_range_from, date_range_to, expires_at, hips,
       abdm_request_id, status, error_recoverability, created_at, updated_at
FROM consent_requests WHERE patient_id = $1 AND status = 'GRANTED'
ORDER BY created_at DESC
"#;

pub const SET_CONSENT_ABDM_REQUEST_ID: &str = r#"
UPDATE consent_requests SET abdm_request_id = $2, updated_at = $3 WHERE id = $1
"#;

pub const UPDATE_CONSENT_STATUS: &str = r#"
UPDATE consent_requests
SET status = $2, error_recoverability = $3, updated_at = $4
WHERE id = $1
"#;

pub const LIST_EXPIRED_CONSENT_REQUESTS: &str = r#"
SELECT id, patient_id, patient_abha_id, requester_id, purpose_code, purpose_text,
       hi_types, date_range_from, date_range_to, expires_at, hips,
       abdm_request_id, status, error_recoverability, created_at, updated_at
FROM consent_requests WHERE status = 'REQUESTED' AND expires_at < $1
"#;

pub const INSERT_CONSENT_ARTIFACT: &str = r#"
INSERT INTO consent_artifacts (
    id, consent_request_id, abdm_artifact_id, permission, signed_payload,
    key_material, granted_at, expires_at, status
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
"#;

pub const GET_ACTIVE_ARTIFACT_BY_CONSENT: &str = r#"
SELECT id, consent_request_id, abdm_artifact_id, permission, signed_payload,
       key_material, granted_at, expires_at, status
FROM consent_artifacts WHERE consent_request_id = $1 AND status = 'ACTIVE'
"#;

pub const GET_ARTIFACT_BY_ID: &str = r#"
SELECT id, consent_request_id, abdm_artifact_id, permission, signed_payload,
       key_material, granted_at, expires_at, status
FROM consent_artifacts WHERE id = $1
"#;

pub const UPDATE_ARTIFACT_STATUS: &str = r#"
UPDATE consent_artifacts SET status = $2 WHERE id = $1
"#;

pub const LIST_EXPIRED_ACTIVE_ARTIFACTS: &str = r#"
SELECT id, consent_request_id, abdm_artifact_id, permission, signed_payload,
       key_material, granted_at, expires_at, status
FROM consent_artifacts WHERE status = 'ACTIVE' AND expires_at < $1
"#;

/// Dedup guard for consent callbacks (spec.md §4.B: dedup by abdmRequestId+seq).
/// A row already existing for this pair means this delivery is a duplicate.
pub const INSERT_CONSENT_CALLBACK_DEDUP: &str = r#"
INSERT INTO consent_callback_dedup (abdm_request_id, seq, received_at)
VALUES ($1, $2, $3)
ON CONFLICT (abdm_request_id, seq) DO NOTHING
"#;
