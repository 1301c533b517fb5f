use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use aws_sdk_auditmanager::error::DisplayErrorContext;
use aws_sdk_auditmanager::types::{AssessmentReportDestinationType, AssessmentStatus as AwsAssessmentStatus};
use aws_sdk_auditmanager::Client;
use tokio::runtime::Runtime;

use auditrep_core::{
    Assessment, AssessmentId, AssessmentStatus, AssessmentSummary, ControlSetId, DestinationType, Evidence,
    EvidenceFolder, EvidenceFolderId, EvidenceId, EvidenceResource, Page, ReportDestination, ReportId, ReportStatus,
    ReportSummary, ServiceStatus, SignedUrl,
};
use auditrep_services::{AssessmentDirectory, AssociationError, EvidenceStore, ReportService};

use crate::session::AwsSession;

/// Largest page the evidence listing APIs accept.
const MAX_RESULTS: i32 = 1000;

/// Audit Manager client implementing the directory, evidence and report seams.
#[derive(Clone)]
pub struct AuditManagerClient {
    rt: Arc<Runtime>,
    client: Client,
}

impl AuditManagerClient {
    pub fn new(session: &AwsSession) -> Self {
        Self { rt: session.rt.clone(), client: Client::new(&session.sdk) }
    }
}

fn sdk_error<E: std::error::Error + 'static>(op: &'static str) -> impl FnOnce(E) -> anyhow::Error {
    move |e| anyhow!("{}: {}", op, DisplayErrorContext(&e))
}

fn token(next_token: Option<&str>) -> Option<String> {
    next_token.map(str::to_string)
}

fn to_aws_status(status: &AssessmentStatus) -> AwsAssessmentStatus {
    match status {
        AssessmentStatus::Active => AwsAssessmentStatus::Active,
        AssessmentStatus::Inactive => AwsAssessmentStatus::Inactive,
    }
}

fn from_aws_status(status: Option<&AwsAssessmentStatus>) -> AssessmentStatus {
    match status {
        Some(AwsAssessmentStatus::Active) => AssessmentStatus::Active,
        _ => AssessmentStatus::Inactive,
    }
}

impl AssessmentDirectory for AuditManagerClient {
    fn account_status(&self) -> Result<ServiceStatus> {
        let out = self
            .rt
            .block_on(self.client.get_account_status().send())
            .map_err(sdk_error("GetAccountStatus"))?;
        Ok(ServiceStatus::parse(out.status().map(|s| s.as_str()).unwrap_or("UNKNOWN")))
    }

    fn list_assessments(&self, status: AssessmentStatus, next_token: Option<&str>) -> Result<Page<AssessmentSummary>> {
        let out = self
            .rt
            .block_on(
                self.client
                    .list_assessments()
                    .status(to_aws_status(&status))
                    .set_next_token(token(next_token))
                    .send(),
            )
            .map_err(sdk_error("ListAssessments"))?;
        let items = out
            .assessment_metadata()
            .iter()
            .filter_map(|m| {
                Some(AssessmentSummary {
                    id: AssessmentId::from_str(m.id()?),
                    name: m.name()?.to_string(),
                    status: from_aws_status(m.status()),
                })
            })
            .collect();
        Ok(Page { items, next_token: out.next_token().map(str::to_string) })
    }

    fn get_assessment(&self, assessment_id: &AssessmentId) -> Result<Assessment> {
        let out = self
            .rt
            .block_on(self.client.get_assessment().assessment_id(assessment_id.as_str()).send())
            .map_err(sdk_error("GetAssessment"))?;
        let metadata = out
            .assessment()
            .and_then(|a| a.metadata())
            .with_context(|| format!("assessment {} returned without metadata", assessment_id))?;
        let reports_destination = metadata.assessment_reports_destination().and_then(|d| {
            let destination_type = match d.destination_type()? {
                AssessmentReportDestinationType::S3 => DestinationType::S3,
                other => DestinationType::Other(other.as_str().to_string()),
            };
            Some(ReportDestination { destination_type, destination: d.destination()?.to_string() })
        });
        Ok(Assessment {
            id: assessment_id.clone(),
            name: metadata.name().unwrap_or_default().to_string(),
            status: from_aws_status(metadata.status()),
            reports_destination,
        })
    }
}

impl EvidenceStore for AuditManagerClient {
    fn list_evidence_folders(&self, assessment_id: &AssessmentId, next_token: Option<&str>) -> Result<Page<EvidenceFolder>> {
        let out = self
            .rt
            .block_on(
                self.client
                    .get_evidence_folders_by_assessment()
                    .assessment_id(assessment_id.as_str())
                    .max_results(MAX_RESULTS)
                    .set_next_token(token(next_token))
                    .send(),
            )
            .map_err(sdk_error("GetEvidenceFoldersByAssessment"))?;
        let items = out
            .evidence_folders()
            .iter()
            .filter_map(|f| {
                Some(EvidenceFolder {
                    id: EvidenceFolderId::from_str(f.id()?),
                    name: f.name()?.to_string(),
                    control_set_id: ControlSetId::from_str(f.control_set_id()?),
                    assessment_id: assessment_id.clone(),
                })
            })
            .collect();
        Ok(Page { items, next_token: out.next_token().map(str::to_string) })
    }

    fn list_evidence(&self, folder: &EvidenceFolder, next_token: Option<&str>) -> Result<Page<Evidence>> {
        let out = self
            .rt
            .block_on(
                self.client
                    .get_evidence_by_evidence_folder()
                    .assessment_id(folder.assessment_id.as_str())
                    .control_set_id(folder.control_set_id.as_str())
                    .evidence_folder_id(folder.id.as_str())
                    .max_results(MAX_RESULTS)
                    .set_next_token(token(next_token))
                    .send(),
            )
            .map_err(sdk_error("GetEvidenceByEvidenceFolder"))?;
        let items = out
            .evidence()
            .iter()
            .filter_map(|e| {
                Some(Evidence {
                    id: EvidenceId::from_str(e.id()?),
                    evidence_folder_id: EvidenceFolderId::from_str(e.evidence_folder_id().unwrap_or(folder.id.as_str())),
                    data_source: e.data_source().map(str::to_string),
                    account_id: e.evidence_aws_account_id().map(str::to_string),
                    event_source: e.event_source().map(str::to_string),
                    event_name: e.event_name().map(str::to_string),
                    evidence_by_type: e.evidence_by_type().map(str::to_string),
                    resources_included: e
                        .resources_included()
                        .iter()
                        .map(|r| EvidenceResource { arn: r.arn().map(str::to_string), value: r.value().map(str::to_string) })
                        .collect(),
                    attributes: e
                        .attributes()
                        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        .unwrap_or_default(),
                    compliance_check: e.compliance_check().map(str::to_string),
                })
            })
            .collect();
        Ok(Page { items, next_token: out.next_token().map(str::to_string) })
    }
}

impl ReportService for AuditManagerClient {
    fn create_report(&self, assessment_id: &AssessmentId, name: &str, description: &str) -> Result<ReportId> {
        let out = self
            .rt
            .block_on(
                self.client
                    .create_assessment_report()
                    .name(name)
                    .assessment_id(assessment_id.as_str())
                    .description(description)
                    .send(),
            )
            .map_err(sdk_error("CreateAssessmentReport"))?;
        let id = out
            .assessment_report()
            .and_then(|r| r.id())
            .ok_or_else(|| auditrep_core::PipelineError::MissingReportId { assessment_id: assessment_id.to_string() })?;
        Ok(ReportId::from_str(id))
    }

    fn list_reports(&self, next_token: Option<&str>) -> Result<Page<ReportSummary>> {
        let out = self
            .rt
            .block_on(self.client.list_assessment_reports().set_next_token(token(next_token)).send())
            .map_err(sdk_error("ListAssessmentReports"))?;
        let items = out
            .assessment_reports()
            .iter()
            .filter_map(|r| {
                Some(ReportSummary { id: ReportId::from_str(r.id()?), status: ReportStatus::parse(r.status()?.as_str()) })
            })
            .collect();
        Ok(Page { items, next_token: out.next_token().map(str::to_string) })
    }

    fn associate_folder(&self, assessment_id: &AssessmentId, folder_id: &EvidenceFolderId) -> Result<()> {
        self.rt
            .block_on(
                self.client
                    .associate_assessment_report_evidence_folder()
                    .assessment_id(assessment_id.as_str())
                    .evidence_folder_id(folder_id.as_str())
                    .send(),
            )
            .map_err(sdk_error("AssociateAssessmentReportEvidenceFolder"))?;
        Ok(())
    }

    fn batch_associate(
        &self,
        assessment_id: &AssessmentId,
        folder_id: &EvidenceFolderId,
        evidence_ids: &[EvidenceId],
    ) -> Result<Vec<AssociationError>> {
        let ids = evidence_ids.iter().map(|id| id.0.clone()).collect();
        let out = self
            .rt
            .block_on(
                self.client
                    .batch_associate_assessment_report_evidence()
                    .assessment_id(assessment_id.as_str())
                    .evidence_folder_id(folder_id.as_str())
                    .set_evidence_ids(Some(ids))
                    .send(),
            )
            .map_err(sdk_error("BatchAssociateAssessmentReportEvidence"))?;
        Ok(out
            .errors()
            .iter()
            .map(|e| AssociationError {
                evidence_id: EvidenceId::from_str(e.evidence_id().unwrap_or_default()),
                code: e.error_code().unwrap_or_default().to_string(),
                message: e.error_message().unwrap_or_default().to_string(),
            })
            .collect())
    }

    fn report_url(&self, assessment_id: &AssessmentId, report_id: &ReportId) -> Result<SignedUrl> {
        let out = self
            .rt
            .block_on(
                self.client
                    .get_assessment_report_url()
                    .assessment_report_id(report_id.as_str())
                    .assessment_id(assessment_id.as_str())
                    .send(),
            )
            .map_err(sdk_error("GetAssessmentReportUrl"))?;
        let url = out.pre_signed_url().with_context(|| format!("no pre-signed url returned for report {}", report_id))?;
        Ok(SignedUrl {
            hyperlink_name: url.hyperlink_name().unwrap_or_default().to_string(),
            link: url.link().unwrap_or_default().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assessment_status_maps_both_ways() {
        assert_eq!(to_aws_status(&AssessmentStatus::Active), AwsAssessmentStatus::Active);
        assert_eq!(from_aws_status(Some(&AwsAssessmentStatus::Active)), AssessmentStatus::Active);
        assert_eq!(from_aws_status(Some(&AwsAssessmentStatus::Inactive)), AssessmentStatus::Inactive);
        assert_eq!(from_aws_status(None), AssessmentStatus::Inactive);
    }

    #[test]
    fn sdk_error_prefixes_operation() {
        let err = sdk_error("ListAssessments")(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(err.to_string().starts_with("ListAssessments: "));
        assert!(err.to_string().contains("boom"));
    }
}
