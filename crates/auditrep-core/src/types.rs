use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ids::*, model::*};

/// Entry of the assessment listing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssessmentSummary {
    pub id: AssessmentId,
    pub name: String,
    pub status: AssessmentStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assessment {
    pub id: AssessmentId,
    pub name: String,
    pub status: AssessmentStatus,
    #[serde(default)]
    pub reports_destination: Option<ReportDestination>,
}

impl Assessment {
    /// Bucket the report (and the evidence export) lands in, when the
    /// destination is S3.
    pub fn s3_destination(&self) -> Option<S3Location> {
        self.reports_destination.as_ref().and_then(ReportDestination::s3_location)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportDestination {
    pub destination_type: DestinationType,
    pub destination: String,
}

impl ReportDestination {
    pub fn s3_location(&self) -> Option<S3Location> {
        match self.destination_type {
            DestinationType::S3 => S3Location::parse(&self.destination),
            DestinationType::Other(_) => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub prefix: Option<String>,
}

impl S3Location {
    /// Parses `s3://bucket` or `s3://bucket/some/prefix`.
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.split_once("://").map(|(_, r)| r)?;
        let (bucket, prefix) = match rest.split_once('/') {
            Some((b, p)) => (b, p.trim_matches('/')),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return None;
        }
        Some(Self {
            bucket: bucket.to_string(),
            prefix: if prefix.is_empty() { None } else { Some(prefix.to_string()) },
        })
    }

    pub fn key_for(&self, key: &str) -> String {
        match &self.prefix {
            Some(p) => format!("{}/{}", p, key),
            None => key.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceFolder {
    pub id: EvidenceFolderId,
    pub name: String,
    pub control_set_id: ControlSetId,
    pub assessment_id: AssessmentId,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceResource {
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evidence {
    pub id: EvidenceId,
    pub evidence_folder_id: EvidenceFolderId,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub event_source: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub evidence_by_type: Option<String>,
    #[serde(default)]
    pub resources_included: Vec<EvidenceResource>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub compliance_check: Option<String>,
}

impl Evidence {
    pub fn is_not_applicable(&self) -> bool {
        self.compliance_check.as_deref() == Some(COMPLIANCE_NOT_APPLICABLE)
    }

    /// Origin type is present and is not the manual sentinel.
    pub fn is_automated(&self) -> bool {
        matches!(self.evidence_by_type.as_deref(), Some(t) if t != MANUAL_EVIDENCE_TYPE)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub id: ReportId,
    pub status: ReportStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedUrl {
    pub hyperlink_name: String,
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_with_and_without_prefix() {
        let loc = S3Location::parse("s3://audit-bucket").unwrap();
        assert_eq!(loc.bucket, "audit-bucket");
        assert_eq!(loc.prefix, None);
        assert_eq!(loc.key_for("a/b"), "a/b");

        let loc = S3Location::parse("s3://audit-bucket/reports/q1/").unwrap();
        assert_eq!(loc.bucket, "audit-bucket");
        assert_eq!(loc.prefix.as_deref(), Some("reports/q1"));
        assert_eq!(loc.key_for("a/b"), "reports/q1/a/b");
    }

    #[test]
    fn rejects_destination_without_scheme_or_bucket() {
        assert!(S3Location::parse("audit-bucket").is_none());
        assert!(S3Location::parse("s3://").is_none());
    }

    #[test]
    fn non_s3_destination_has_no_location() {
        let dest = ReportDestination {
            destination_type: DestinationType::Other("EMAIL".into()),
            destination: "s3://ignored".into(),
        };
        assert!(dest.s3_location().is_none());
    }

    #[test]
    fn automated_requires_present_non_manual_type() {
        let mut ev = Evidence {
            id: EvidenceId::from_str("e1"),
            evidence_folder_id: EvidenceFolderId::from_str("f1"),
            data_source: None,
            account_id: None,
            event_source: None,
            event_name: None,
            evidence_by_type: None,
            resources_included: vec![],
            attributes: BTreeMap::new(),
            compliance_check: None,
        };
        assert!(!ev.is_automated());
        ev.evidence_by_type = Some(MANUAL_EVIDENCE_TYPE.into());
        assert!(!ev.is_automated());
        ev.evidence_by_type = Some("Compliance check".into());
        assert!(ev.is_automated());
    }
}
