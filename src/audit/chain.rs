use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{ConsentAuditEvent, ConsentAuditEventKind};

/// Hash linking each consent audit event to the one before it for the same
/// consent request, so a tampered or deleted row breaks the chain for
/// every event after it (spec.md §8 invariant 5).
pub const GENESIS_HASH: &str = "0";

fn compute_hash(
    id: Uuid,
    consent_request_id: Uuid,
    event: &ConsentAuditEventKind,
    actor: &str,
    details: &serde_json::Value,
    at: DateTime<Utc>,
    previous_hash: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(consent_request_id.as_bytes());
    hasher.update(event.to_string().as_bytes());
    hasher.update(actor.as_bytes());
    hasher.update(details.to_string().as_bytes());
    hasher.update(at.to_rfc3339().as_bytes());
    hasher.update(previous_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Builds the next event in a consent's audit chain given the hash of the
/// last persisted event (or [`GENESIS_HASH`] if this is the first).
pub fn next_event(
    consent_request_id: Uuid,
    event: ConsentAuditEventKind,
    actor: String,
    details: serde_json::Value,
    previous_hash: &str,
) -> ConsentAuditEvent {
    let id = Uuid::new_v4();
    let at = Utc::now();
    let chain_hash = compute_hash(id, consent_request_id, &event, &actor, &details, at, previous_hash);
    ConsentAuditEvent {
        id,
        consent_request_id,
        event,
        actor,
        details,
        at,
        previous_hash: previous_hash.to_string(),
        chain_hash,
    }
}

/// Recomputes each event's hash and checks both the hash itself and the
/// link to the previous event. Events must be ordered oldest-first.
pub fn verify_chain(events: &[ConsentAuditEvent]) -> bool {
    let mut expected_previous = GENESIS_HASH.to_string();
    for event in events {
        if event.previous_hash != expected_previous {
            return false;
        }
        let recomputed = compute_hash(
            event.id,
            event.consent_request_id,
            &event.event,
            &event.actor,
            &event.details,
            event.at,
            &event.previous_hash,
        );
        if recomputed != event.chain_hash {
            return false;
        }
        expected_previous = event.chain_hash.clone();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chain_of_three_verifies() {
        let consent_id = Uuid::new_v4();
        let e1 = next_event(
            consent_id,
            ConsentAuditEventKind::Created,
            "system".into(),
            json!({}),
            GENESIS_HASH,
        );
        let e2 = next_event(
            consent_id,
            ConsentAuditEventKind::CallbackReceived,
            "abdm-gateway".into(),
            json!({"status": "GRANTED"}),
            &e1.chain_hash,
        );
        let e3 = next_event(
            consent_id,
            ConsentAuditEventKind::Granted,
            "system".into(),
            json!({}),
            &e2.chain_hash,
        );
        assert!(verify_chain(&[e1, e2, e3]));
    }

    #[test]
    fn tampering_breaks_verification() {
        let consent_id = Uuid::new_v4();
        let e1 = next_event(
            consent_id,
            ConsentAuditEventKind::Created,
            "system".into(),
            json!({}),
            GENESIS_HASH,
        );
        let mut e2 = next_event(
            consent_id,
            ConsentAuditEventKind::Granted,
            "system".into(),
            json!({}),
            &e1.chain_hash,
        );
        e2.details = json!({"tampered": true});
        assert!(!verify_chain(&[e1, e2]));
    }
}
