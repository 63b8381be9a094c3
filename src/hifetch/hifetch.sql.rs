pub const INSERT_HI_FETCH_REQUEST: &str = r#"
INSERT INTO hi_fetch_requests (
    id, consent_artifact_id, patient_id, doctor_id, abdm_request_id, hi_types,
    date_range_from, date_range_to, status, total_records, completed_records,
    failed_records, end_of_stream_received, created_at, updated_at, terminal_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
"#;

pub const GET_HI_FETCH_REQUEST_BY_ID: &str = r#"
SELECT id, consent_artifact_id, patient_id, doctor_id, abdm_request_id, hi_types,
       date_range_from, date_range_to, status, total_records, completed_records,
       failed_records, end_of_stream_received, created_at, updated_at, terminal_at
FROM hi_fetch_requests WHERE id = $1
"#;

pub const GET_HI_FETCH_REQUEST_BY_ABDM_ID: &str = r#"
SELECT id, consent_artifact_id, patient_id, doctor_id, abdm_request_id, hi_types,
       date_range_from, date_range_to, status, total_records, completed_records,
       failed_records, end_of_stream_received, created_at, updated_at, terminal_at
FROM hi_fetch_requests WHERE abdm_request_id = $1
"#;

pub const UPDATE_HI_FETCH_STATUS: &str = r#"
UPDATE hi_fetch_requests SET status = $2, updated_at = $3 WHERE id = $1
"#;

pub const SET_HI_FETCH_TOTAL_RECORDS: &str = r#"
UPDATE hi_fetch_requests SET total_records = $2, updated_at = $3 WHERE id = $1
"#;

pub const SET_HI_FETCH_END_OF_STREAM: &str = r#"
UPDATE hi_fetch_requests SET end_of_stream_received = true, updated_at = $2 WHERE id = $1
"#;

pub const UPDATE_HI_FETCH_COUNTERS: &str = r#"
UPDATE hi_fetch_requests
SET completed_records = $2, failed_records = $3, status = $4, terminal_at = $5, updated_at = $6
WHERE id = $1
"#;

pub const LIST_NON_TERMINAL_HI_FETCH_REQUESTS: &str = r#"
SELECT id, consent_artifact_id, patient_id, doctor_id, abdm_request_id, hi_types,
       date_range_from, date_range_to, status, total_records, completed_records,
       failed_records, end_of_stream_received, created_at, updated_at, terminal_at
FROM hi_fetch_requests WHERE status IN ('PENDING', 'PROCESSING') AND updated_at < $1
"#;

/// Dedup guard for health-record callbacks (spec.md §4.C: dedup by abdmRequestId+seq).
pub const INSERT_HI_FETCH_CALLBACK_DEDUP: &str = r#"
INSERT INTO hi_fetch_callback_dedup (abdm_request_id, seq, received_at)
VALUES ($1, $2, $3)
ON CONFLICT (abdm_request_id, seq) DO NOTHING
"#;
