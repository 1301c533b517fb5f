use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use auditrep_core::{Evidence, EvidenceFolderId, EvidenceId};

/// Column order of the evidence export.
pub const EVIDENCE_CSV_HEADER: [&str; 10] = [
    "dataSource",
    "evidenceAwsAccountId",
    "eventSource",
    "eventName",
    "evidenceByType",
    "resourcesIncluded",
    "attributes",
    "complianceCheck",
    "evidenceFolderId",
    "id",
];

/// One CSV row. Field order matches [`EVIDENCE_CSV_HEADER`]; composite
/// fields are carried as compact JSON.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceRow {
    #[serde(rename = "dataSource")]
    pub data_source: Option<String>,
    #[serde(rename = "evidenceAwsAccountId")]
    pub account_id: Option<String>,
    #[serde(rename = "eventSource")]
    pub event_source: Option<String>,
    #[serde(rename = "eventName")]
    pub event_name: Option<String>,
    #[serde(rename = "evidenceByType")]
    pub evidence_by_type: Option<String>,
    #[serde(rename = "resourcesIncluded")]
    pub resources_included: String,
    pub attributes: String,
    #[serde(rename = "complianceCheck")]
    pub compliance_check: Option<String>,
    #[serde(rename = "evidenceFolderId")]
    pub evidence_folder_id: String,
    pub id: String,
}

impl EvidenceRow {
    pub fn from_evidence(ev: &Evidence) -> Result<Self> {
        Ok(Self {
            data_source: ev.data_source.clone(),
            account_id: ev.account_id.clone(),
            event_source: ev.event_source.clone(),
            event_name: ev.event_name.clone(),
            evidence_by_type: ev.evidence_by_type.clone(),
            resources_included: serde_json::to_string(&ev.resources_included)
                .with_context(|| format!("encode resources of evidence {}", ev.id))?,
            attributes: serde_json::to_string(&ev.attributes)
                .with_context(|| format!("encode attributes of evidence {}", ev.id))?,
            compliance_check: ev.compliance_check.clone(),
            evidence_folder_id: ev.evidence_folder_id.0.clone(),
            id: ev.id.0.clone(),
        })
    }

    pub fn into_evidence(self) -> Result<Evidence> {
        let resources_included = serde_json::from_str(&self.resources_included)
            .with_context(|| format!("decode resourcesIncluded of evidence {}", self.id))?;
        let attributes = serde_json::from_str(&self.attributes)
            .with_context(|| format!("decode attributes of evidence {}", self.id))?;
        Ok(Evidence {
            id: EvidenceId::from_str(self.id),
            evidence_folder_id: EvidenceFolderId::from_str(self.evidence_folder_id),
            data_source: self.data_source,
            account_id: self.account_id,
            event_source: self.event_source,
            event_name: self.event_name,
            evidence_by_type: self.evidence_by_type,
            resources_included,
            attributes,
            compliance_check: self.compliance_check,
        })
    }
}
