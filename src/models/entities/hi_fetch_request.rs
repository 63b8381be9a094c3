use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::types::{FetchStatus, HiType};

/// An invocation of the HI Exchange using one consent artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiFetchRequest {
    pub id: Uuid,
    pub consent_artifact_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub abdm_request_id: Uuid,
    pub hi_types: HashSet<HiType>,
    pub date_range_from: DateTime<Utc>,
    pub date_range_to: DateTime<Utc>,
    pub status: FetchStatus,
    pub total_records: Option<u32>,
    pub completed_records: u32,
    pub failed_records: u32,
    /// Set once a health-record callback arrives with `endOfStream: true`
    /// but no `totalRecords` (spec.md §4.C, §6.2) — an alternate signal
    /// that no further batches will arrive for this fetch, used by
    /// [`Self::is_end_of_stream_complete`] alongside the `totalRecords`
    /// comparison.
    pub end_of_stream_received: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub terminal_at: Option<DateTime<Utc>>,
}

impl HiFetchRequest {
    pub fn new(
        consent_artifact_id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        hi_types: HashSet<HiType>,
        date_range_from: DateTime<Utc>,
        date_range_to: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            consent_artifact_id,
            patient_id,
            doctor_id,
            abdm_request_id: Uuid::new_v4(),
            hi_types,
            date_range_from,
            date_range_to,
            status: FetchStatus::Pending,
            total_records: None,
            completed_records: 0,
            failed_records: 0,
            end_of_stream_received: false,
            created_at: now,
            updated_at: now,
            terminal_at: None,
        }
    }

    /// Invariant: completedRecords + failedRecords <= totalRecords (when known).
    pub fn validate_invariants(&self) -> Result<(), String> {
        if let Some(total) = self.total_records {
            if self.completed_records + self.failed_records > total {
                return Err("completed + failed records exceed totalRecords".to_string());
            }
        }
        Ok(())
    }

    pub fn progress_percent(&self) -> Option<f32> {
        self.total_records.map(|total| {
            if total == 0 {
                100.0
            } else {
                ((self.completed_records + self.failed_records) as f32 / total as f32) * 100.0
            }
        })
    }

    /// §4.C termination rule: COMPLETED iff failedRecords == 0, else PARTIAL.
    pub fn terminal_status(&self) -> FetchStatus {
        if self.failed_records == 0 {
            FetchStatus::Completed
        } else {
            FetchStatus::Partial
        }
    }

    /// True once `totalRecords` is known and fully accounted for, or once
    /// ABDM has signaled `endOfStream` without ever supplying a total.
    pub fn is_end_of_stream_complete(&self) -> bool {
        match self.total_records {
            Some(total) => self.completed_records + self.failed_records == total,
            None => self.end_of_stream_received,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HiFetchRequest {
        let now = Utc::now();
        HiFetchRequest::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            HashSet::from([HiType::Prescription]),
            now - chrono::Duration::days(30),
            now,
        )
    }

    #[test]
    fn mints_a_local_abdm_request_id() {
        let request = request();
        assert_ne!(request.abdm_request_id, Uuid::nil());
    }

    #[test]
    fn rejects_counters_exceeding_total() {
        let mut request = request();
        request.total_records = Some(5);
        request.completed_records = 3;
        request.failed_records = 3;
        assert!(request.validate_invariants().is_err());
    }

    #[test]
    fn progress_percent_is_none_before_total_is_known() {
        let request = request();
        assert_eq!(request.progress_percent(), None);
    }

    #[test]
    fn progress_percent_tracks_completed_and_failed() {
        let mut request = request();
        request.total_records = Some(10);
        request.completed_records = 4;
        request.failed_records = 1;
        assert_eq!(request.progress_percent(), Some(50.0));
    }

    #[test]
    fn terminal_status_is_completed_only_without_failures() {
        let mut request = request();
        request.completed_records = 10;
        assert_eq!(request.terminal_status(), FetchStatus::Completed);

        request.failed_records = 1;
        assert_eq!(request.terminal_status(), FetchStatus::Partial);
    }

    #[test]
    fn end_of_stream_requires_known_total() {
        let mut request = request();
        request.completed_records = 3;
        assert!(!request.is_end_of_stream_complete());

        request.total_records = Some(3);
        assert!(request.is_end_of_stream_complete());
    }

    #[test]
    fn end_of_stream_flag_terminates_without_a_known_total() {
        let mut request = request();
        request.completed_records = 1;
        assert!(!request.is_end_of_stream_complete());

        request.end_of_stream_received = true;
        assert!(request.is_end_of_stream_complete());
    }
}
