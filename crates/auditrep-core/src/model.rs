use serde::{Deserialize, Serialize};

/// Origin type Audit Manager assigns to manually uploaded evidence.
pub const MANUAL_EVIDENCE_TYPE: &str = "Manual";

/// Compliance check value for evidence that does not apply to a control.
pub const COMPLIANCE_NOT_APPLICABLE: &str = "NOT_APPLICABLE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    Active,
    Inactive,
    PendingActivation,
    Unknown(String),
}

impl ServiceStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "ACTIVE" => ServiceStatus::Active,
            "INACTIVE" => ServiceStatus::Inactive,
            "PENDING_ACTIVATION" => ServiceStatus::PendingActivation,
            other => ServiceStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceStatus::Active => "ACTIVE",
            ServiceStatus::Inactive => "INACTIVE",
            ServiceStatus::PendingActivation => "PENDING_ACTIVATION",
            ServiceStatus::Unknown(s) => s,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    Active,
    Inactive,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Active => "ACTIVE",
            AssessmentStatus::Inactive => "INACTIVE",
        }
    }
}

/// Status of an assessment report as read back from the report listing.
/// COMPLETE and FAILED are terminal.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum ReportStatus {
    InProgress,
    Complete,
    Failed,
    Unknown(String),
}

impl ReportStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "IN_PROGRESS" => ReportStatus::InProgress,
            "COMPLETE" => ReportStatus::Complete,
            "FAILED" => ReportStatus::Failed,
            other => ReportStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReportStatus::InProgress => "IN_PROGRESS",
            ReportStatus::Complete => "COMPLETE",
            ReportStatus::Failed => "FAILED",
            ReportStatus::Unknown(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Complete | ReportStatus::Failed)
    }
}

impl From<String> for ReportStatus {
    fn from(s: String) -> Self {
        ReportStatus::parse(&s)
    }
}

impl From<ReportStatus> for String {
    fn from(s: ReportStatus) -> Self {
        s.as_str().to_string()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum DestinationType {
    S3,
    Other(String),
}

impl From<String> for DestinationType {
    fn from(s: String) -> Self {
        if s == "S3" {
            DestinationType::S3
        } else {
            DestinationType::Other(s)
        }
    }
}

impl From<DestinationType> for String {
    fn from(d: DestinationType) -> Self {
        match d {
            DestinationType::S3 => "S3".to_string(),
            DestinationType::Other(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_status_parses_known_and_unknown_values() {
        assert_eq!(ReportStatus::parse("COMPLETE"), ReportStatus::Complete);
        assert_eq!(ReportStatus::parse("IN_PROGRESS"), ReportStatus::InProgress);
        assert_eq!(ReportStatus::parse("FAILED"), ReportStatus::Failed);
        assert_eq!(ReportStatus::parse("QUEUED"), ReportStatus::Unknown("QUEUED".into()));
    }

    #[test]
    fn only_complete_and_failed_are_terminal() {
        assert!(ReportStatus::Complete.is_terminal());
        assert!(ReportStatus::Failed.is_terminal());
        assert!(!ReportStatus::InProgress.is_terminal());
        assert!(!ReportStatus::Unknown("X".into()).is_terminal());
    }

    #[test]
    fn service_status_round_trips_api_strings() {
        for s in ["ACTIVE", "INACTIVE", "PENDING_ACTIVATION", "SOMETHING"] {
            assert_eq!(ServiceStatus::parse(s).as_str(), s);
        }
    }
}
