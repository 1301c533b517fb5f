use std::time::{Duration, Instant};

use auditrep_core::{
    Assessment, AssessmentId, AssessmentStatus, AssessmentSummary, Evidence, EvidenceFolder, EvidenceFolderId,
    EvidenceId, Page, ReportId, ReportSummary, ServiceStatus, SignedUrl,
};

/// Assessment lookups.
pub trait AssessmentDirectory: Send + Sync {
    fn account_status(&self) -> anyhow::Result<ServiceStatus>;

    fn list_assessments(&self, status: AssessmentStatus, next_token: Option<&str>) -> anyhow::Result<Page<AssessmentSummary>>;

    fn get_assessment(&self, assessment_id: &AssessmentId) -> anyhow::Result<Assessment>;
}

pub trait EvidenceStore: Send + Sync {
    fn list_evidence_folders(&self, assessment_id: &AssessmentId, next_token: Option<&str>) -> anyhow::Result<Page<EvidenceFolder>>;

    /// Evidence of one folder, addressed by its assessment, control set and id.
    fn list_evidence(&self, folder: &EvidenceFolder, next_token: Option<&str>) -> anyhow::Result<Page<Evidence>>;
}

/// Per-item rejection reported by a batch association call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssociationError {
    pub evidence_id: EvidenceId,
    pub code: String,
    pub message: String,
}

pub trait ReportService: Send + Sync {
    fn create_report(&self, assessment_id: &AssessmentId, name: &str, description: &str) -> anyhow::Result<ReportId>;

    fn list_reports(&self, next_token: Option<&str>) -> anyhow::Result<Page<ReportSummary>>;

    /// Associates a whole evidence folder with the next report.
    fn associate_folder(&self, assessment_id: &AssessmentId, folder_id: &EvidenceFolderId) -> anyhow::Result<()>;

    /// Associates up to `ASSOCIATION_BATCH_LIMIT` evidence ids of one folder.
    fn batch_associate(
        &self,
        assessment_id: &AssessmentId,
        folder_id: &EvidenceFolderId,
        evidence_ids: &[EvidenceId],
    ) -> anyhow::Result<Vec<AssociationError>>;

    fn report_url(&self, assessment_id: &AssessmentId, report_id: &ReportId) -> anyhow::Result<SignedUrl>;
}

pub trait ObjectStorage: Send + Sync {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()>;
}

/// Best-effort message channel. Callers never treat a publish error as fatal.
pub trait Notifier: Send + Sync {
    fn publish(&self, subject: &str, message: &str) -> anyhow::Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
