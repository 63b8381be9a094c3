use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::types::{ArtifactStatus, HiType};

/// The access mode, HI types, date range and data-erase instant granted by the CM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentPermission {
    pub access_mode: String,
    pub hi_types: HashSet<HiType>,
    pub date_range_from: DateTime<Utc>,
    pub date_range_to: DateTime<Utc>,
    pub data_erase_at: DateTime<Utc>,
}

/// The signed, time-bounded permission object issued by the Consent Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentArtifact {
    pub id: Uuid,
    pub consent_request_id: Uuid,
    pub abdm_artifact_id: String,
    pub permission: ConsentPermission,
    pub signed_payload: String,
    pub key_material: Option<String>,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ArtifactStatus,
}

impl ConsentArtifact {
    pub fn new(
        consent_request_id: Uuid,
        abdm_artifact_id: String,
        permission: ConsentPermission,
        signed_payload: String,
        key_material: Option<String>,
        granted_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            consent_request_id,
            abdm_artifact_id,
            permission,
            signed_payload,
            key_material,
            granted_at,
            expires_at,
            status: ArtifactStatus::Active,
        }
    }

    /// Invariant: expiresAt > grantedAt.
    pub fn validate_invariants(&self) -> Result<(), String> {
        if self.expires_at <= self.granted_at {
            return Err("expiresAt must be after grantedAt".to_string());
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == ArtifactStatus::Active
    }

    /// §4.C scope check: requested hiTypes/dateRange must be within this artifact's grant.
    pub fn covers(
        &self,
        requested_hi_types: &HashSet<HiType>,
        requested_from: DateTime<Utc>,
        requested_to: DateTime<Utc>,
    ) -> bool {
        let types_ok = requested_hi_types.is_subset(&self.permission.hi_types);
        let range_ok =
            requested_from >= self.permission.date_range_from && requested_to <= self.permission.date_range_to;
        types_ok && range_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn artifact(granted_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> ConsentArtifact {
        ConsentArtifact::new(
            Uuid::new_v4(),
            "abdm-artifact-1".to_string(),
            ConsentPermission {
                access_mode: "VIEW".to_string(),
                hi_types: HashSet::from([HiType::DiagnosticReport, HiType::Prescription]),
                date_range_from: granted_at - Duration::days(30),
                date_range_to: expires_at,
                data_erase_at: expires_at + Duration::days(365),
            },
            "signed-payload".to_string(),
            Some("key-material".to_string()),
            granted_at,
            expires_at,
        )
    }

    #[test]
    fn rejects_expiry_not_after_grant() {
        let now = Utc::now();
        let artifact = artifact(now, now - Duration::seconds(1));
        assert!(artifact.validate_invariants().is_err());
    }

    #[test]
    fn covers_requires_hi_types_to_be_a_subset() {
        let now = Utc::now();
        let artifact = artifact(now, now + Duration::days(90));
        let requested = HashSet::from([HiType::DiagnosticReport]);
        assert!(artifact.covers(&requested, now - Duration::days(10), now));

        let requested = HashSet::from([HiType::DiagnosticReport, HiType::ImmunizationRecord]);
        assert!(!artifact.covers(&requested, now - Duration::days(10), now));
    }

    #[test]
    fn covers_requires_date_range_within_grant() {
        let now = Utc::now();
        let artifact = artifact(now, now + Duration::days(90));
        let requested = HashSet::from([HiType::Prescription]);
        assert!(!artifact.covers(&requested, now - Duration::days(400), now));
    }
}
