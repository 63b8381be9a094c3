/// SQL queries for the three regulatory log tables: consent lifecycle
/// events, record processing stages, and patient-data access.

pub const INSERT_CONSENT_AUDIT_EVENT: &str = r#"
    INSERT INTO consent_audit_events (
        id, consent_request_id, event, actor, details, at, previous_hash, chain_hash
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8
    )
"#;

pub const GET_LAST_CONSENT_AUDIT_EVENT: &str = r#"
    SELECT id, consent_request_id, event, actor, details, at, previous_hash, chain_hash
    FROM consent_audit_events
    WHERE consent_request_id = $1
    ORDER BY at DESC
    LIMIT 1
"#;

pub const GET_CONSENT_AUDIT_EVENTS: &str = r#"
    SELECT id, consent_request_id, event, actor, details, at, previous_hash, chain_hash
    FROM consent_audit_events
    WHERE consent_request_id = $1
    ORDER BY at ASC
"#;

pub const INSERT_PROCESSING_LOG: &str = r#"
    INSERT INTO processing_logs (
        id, fetch_request_id, health_record_id, abdm_record_id, stage, outcome,
        processing_time_ms, details, at
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9
    )
"#;

pub const GET_PROCESSING_LOGS_BY_FETCH: &str = r#"
    SELECT id, fetch_request_id, health_record_id, abdm_record_id, stage, outcome,
        processing_time_ms, details, at
    FROM processing_logs
    WHERE fetch_request_id = $1
    ORDER BY at ASC
"#;

pub const INSERT_ACCESS_LOG: &str = r#"
    INSERT INTO access_logs (
        id, health_record_id, user_id, access_type, ip, user_agent, at
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7
    )
"#;

pub const GET_ACCESS_LOGS_BY_RECORD: &str = r#"
    SELECT id, health_record_id, user_id, access_type, ip, user_agent, at
    FROM access_logs
    WHERE health_record_id = $1
    ORDER BY at DESC
    LIMIT $2 OFFSET $3
"#;

pub const GET_ACCESS_LOGS_BY_USER: &str = r#"
    SELECT id, health_record_id, user_id, access_type, ip, user_agent, at
    FROM access_logs
    WHERE user_id = $1
    ORDER BY at DESC
    LIMIT $2 OFFSET $3
"#;
