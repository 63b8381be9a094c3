use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::types::{ConsentStatus, ErrorRecoverability, HiType};

/// A HIU-initiated ask for patient data (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRequest {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_abha_id: String,
    pub requester_id: Uuid,
    pub purpose_code: String,
    pub purpose_text: String,
    pub hi_types: HashSet<HiType>,
    pub date_range_from: DateTime<Utc>,
    pub date_range_to: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hips: Option<Vec<String>>,
    pub abdm_request_id: Option<Uuid>,
    pub status: ConsentStatus,
    pub error_recoverability: Option<ErrorRecoverability>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConsentRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        patient_id: Uuid,
        patient_abha_id: String,
        requester_id: Uuid,
        purpose_code: String,
        purpose_text: String,
        hi_types: HashSet<HiType>,
        date_range_from: DateTime<Utc>,
        date_range_to: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        hips: Option<Vec<String>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            patient_id,
            patient_abha_id,
            requester_id,
            purpose_code,
            purpose_text,
            hi_types,
            date_range_from,
            date_range_to,
            expires_at,
            hips,
            abdm_request_id: None,
            status: ConsentStatus::Requested,
            error_recoverability: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Invariant from spec.md §3: dateRangeFrom <= dateRangeTo <= expiresAt, non-empty hiTypes.
    pub fn validate_invariants(&self) -> Result<(), String> {
        if self.hi_types.is_empty() {
            return Err("hiTypes must be non-empty".to_string());
        }
        if self.date_range_from > self.date_range_to {
            return Err("dateRangeFrom must be <= dateRangeTo".to_string());
        }
        if self.date_range_to > self.expires_at {
            return Err("dateRangeTo must be <= expiresAt".to_string());
        }
        Ok(())
    }

    /// Monotonic transition check: REQUESTED -> any, GRANTED -> REVOKED/EXPIRED, terminal -> none.
    pub fn can_transition_to(&self, next: ConsentStatus) -> bool {
        match self.status {
            ConsentStatus::Requested => true,
            ConsentStatus::Granted => {
                matches!(next, ConsentStatus::Revoked | ConsentStatus::Expired)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request() -> ConsentRequest {
        let now = Utc::now();
        ConsentRequest::new(
            Uuid::new_v4(),
            "patient-abha-1".to_string(),
            Uuid::new_v4(),
            "CAREMGT".to_string(),
            "Care management".to_string(),
            HashSet::from([HiType::DiagnosticReport]),
            now - Duration::days(30),
            now,
            now + Duration::days(7),
            None,
        )
    }

    #[test]
    fn rejects_empty_hi_types() {
        let mut request = request();
        request.hi_types = HashSet::new();
        assert!(request.validate_invariants().is_err());
    }

    #[test]
    fn rejects_date_range_from_after_to() {
        let mut request = request();
        request.date_range_from = request.date_range_to + Duration::days(1);
        assert!(request.validate_invariants().is_err());
    }

    #[test]
    fn rejects_date_range_to_after_expiry() {
        let mut request = request();
        request.date_range_to = request.expires_at + Duration::days(1);
        assert!(request.validate_invariants().is_err());
    }

    #[test]
    fn requested_can_transition_anywhere() {
        let request = request();
        assert!(request.can_transition_to(ConsentStatus::Granted));
        assert!(request.can_transition_to(ConsentStatus::Denied));
    }

    #[test]
    fn granted_can_only_move_to_revoked_or_expired() {
        let mut request = request();
        request.status = ConsentStatus::Granted;
        assert!(request.can_transition_to(ConsentStatus::Revoked));
        assert!(request.can_transition_to(ConsentStatus::Expired));
        assert!(!request.can_transition_to(ConsentStatus::Denied));
    }

    #[test]
    fn terminal_statuses_cannot_transition() {
        let mut request = request();
        request.status = ConsentStatus::Revoked;
        assert!(!request.can_transition_to(ConsentStatus::Granted));
    }
}
