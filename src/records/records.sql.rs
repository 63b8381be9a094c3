pub const INSERT_HEALTH_RECORD: &str = r#"
INSERT INTO health_records (
    id, patient_id, fetch_request_id, abdm_record_id, record_type, record_date,
    provider_id, provider_name, provider_type, fhir_resource, checksum, source,
    status, version, created_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
"#;

pub const GET_HEALTH_RECORD_BY_ID: &str = r#"
SELECT id, patient_id, fetch_request_id, abdm_record_id, record_type, record_date,
       provider_id, provider_name, provider_type, fhir_resource, checksum, source,
       status, version, created_at
FROM health_records WHERE id = $1
"#;

pub const GET_ACTIVE_BY_ABDM_RECORD_ID: &str = r#"
SELECT id, patient_id, fetch_request_id, abdm_record_id, record_type, record_date,
       provider_id, provider_name, provider_type, fhir_resource, checksum, source,
       status, version, created_at
FROM health_records WHERE abdm_record_id = $1 AND status = 'ACTIVE'
"#;

pub const SUPERSEDE_HEALTH_RECORD: &str = r#"
UPDATE health_records SET status = 'SUPERSEDED' WHERE id = $1
"#;

pub const SOFT_DELETE_HEALTH_RECORD: &str = r#"
UPDATE health_records SET status = 'DELETED' WHERE id = $1
"#;

pub const FIND_HEALTH_RECORDS_BY_PATIENT: &str = r#"
SELECT id, patient_id, fetch_request_id, abdm_record_id, record_type, record_date,
       provider_id, provider_name, provider_type, fhir_resource, checksum, source,
       status, version, created_at
FROM health_records
WHERE patient_id = $1
  AND status = 'ACTIVE'
  AND ($2::text IS NULL OR record_type = $2)
  AND ($3::text IS NULL OR source = $3)
  AND ($4::timestamptz IS NULL OR record_date >= $4)
  AND ($5::timestamptz IS NULL OR record_date <= $5)
ORDER BY record_date DESC, created_at DESC
LIMIT $6 OFFSET $7
"#;
