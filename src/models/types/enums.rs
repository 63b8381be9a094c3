use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Closed enumeration of health-information categories an HIU may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HiType {
    DiagnosticReport,
    Prescription,
    DischargeSummary,
    OPConsultation,
    ImmunizationRecord,
    HealthDocumentRecord,
    WellnessRecord,
    Observation,
    Condition,
    Procedure,
    MedicationRequest,
    AllergyIntolerance,
}

impl Display for HiType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:?}", self)
    }
}

impl HiType {
    pub fn all() -> &'static [HiType] {
        use HiType::*;
        &[
            DiagnosticReport,
            Prescription,
            DischargeSummary,
            OPConsultation,
            ImmunizationRecord,
            HealthDocumentRecord,
            WellnessRecord,
            Observation,
            Condition,
            Procedure,
            MedicationRequest,
            AllergyIntolerance,
        ]
    }
}

/// ConsentRequest lifecycle (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsentStatus {
    Requested,
    Granted,
    Denied,
    Expired,
    Revoked,
    Error,
}

impl ConsentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConsentStatus::Denied
                | ConsentStatus::Expired
                | ConsentStatus::Revoked
                | ConsentStatus::Error
        )
    }
}

impl Display for ConsentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            ConsentStatus::Requested => "REQUESTED",
            ConsentStatus::Granted => "GRANTED",
            ConsentStatus::Denied => "DENIED",
            ConsentStatus::Expired => "EXPIRED",
            ConsentStatus::Revoked => "REVOKED",
            ConsentStatus::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Whether an ERROR ConsentRequest may be resubmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorRecoverability {
    Recoverable,
    Fatal,
}

/// ConsentArtifact lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArtifactStatus {
    Active,
    Expired,
    Revoked,
}

impl Display for ArtifactStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            ArtifactStatus::Active => "ACTIVE",
            ArtifactStatus::Expired => "EXPIRED",
            ArtifactStatus::Revoked => "REVOKED",
        };
        write!(f, "{}", s)
    }
}

/// HIFetchRequest lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FetchStatus {
    Pending,
    Processing,
    Completed,
    Partial,
    Failed,
    Cancelled,
}

impl FetchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FetchStatus::Completed
                | FetchStatus::Partial
                | FetchStatus::Failed
                | FetchStatus::Cancelled
        )
    }
}

impl Display for FetchStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            FetchStatus::Pending => "PENDING",
            FetchStatus::Processing => "PROCESSING",
            FetchStatus::Completed => "COMPLETED",
            FetchStatus::Partial => "PARTIAL",
            FetchStatus::Failed => "FAILED",
            FetchStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Provenance of a HealthRecord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordSource {
    Abdm,
    Local,
    Imported,
}

impl Display for RecordSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            RecordSource::Abdm => "ABDM",
            RecordSource::Local => "LOCAL",
            RecordSource::Imported => "IMPORTED",
        };
        write!(f, "{}", s)
    }
}

/// HealthRecord row lifecycle (never overwritten, only superseded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordStatus {
    Active,
    Superseded,
    Deleted,
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            RecordStatus::Active => "ACTIVE",
            RecordStatus::Superseded => "SUPERSEDED",
            RecordStatus::Deleted => "DELETED",
        };
        write!(f, "{}", s)
    }
}

/// ProcessingLog pipeline stage (spec.md §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingStage {
    Receive,
    Decrypt,
    Validate,
    Store,
    Error,
}

impl Display for ProcessingStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            ProcessingStage::Receive => "RECEIVE",
            ProcessingStage::Decrypt => "DECRYPT",
            ProcessingStage::Validate => "VALIDATE",
            ProcessingStage::Store => "STORE",
            ProcessingStage::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingOutcome {
    Success,
    Failure,
}

impl Display for ProcessingOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            ProcessingOutcome::Success => "SUCCESS",
            ProcessingOutcome::Failure => "FAILURE",
        };
        write!(f, "{}", s)
    }
}

/// AccessLog access kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessType {
    View,
    Export,
    Print,
    Share,
}

impl Display for AccessType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            AccessType::View => "VIEW",
            AccessType::Export => "EXPORT",
            AccessType::Print => "PRINT",
            AccessType::Share => "SHARE",
        };
        write!(f, "{}", s)
    }
}

/// ConsentAuditEvent kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsentAuditEventKind {
    Created,
    Submitted,
    Granted,
    Denied,
    Expired,
    Revoked,
    Error,
    CallbackReceived,
    CallbackOrphan,
    CallbackAfterTerminal,
}

impl Display for ConsentAuditEventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            ConsentAuditEventKind::Created => "CREATED",
            ConsentAuditEventKind::Submitted => "SUBMITTED",
            ConsentAuditEventKind::Granted => "GRANTED",
            ConsentAuditEventKind::Denied => "DENIED",
            ConsentAuditEventKind::Expired => "EXPIRED",
            ConsentAuditEventKind::Revoked => "REVOKED",
            ConsentAuditEventKind::Error => "ERROR",
            ConsentAuditEventKind::CallbackReceived => "CALLBACK_RECEIVED",
            ConsentAuditEventKind::CallbackOrphan => "CALLBACK_ORPHAN",
            ConsentAuditEventKind::CallbackAfterTerminal => "CALLBACK_AFTER_TERMINAL",
        };
        write!(f, "{}", s)
    }
}

/// Clinician role, used for the ownership check in §4.F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Doctor,
    Admin,
}
