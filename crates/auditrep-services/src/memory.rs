use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail};
use serde::Deserialize;
use tracing::debug;

use auditrep_core::{
    Assessment, AssessmentId, AssessmentStatus, AssessmentSummary, Evidence, EvidenceFolder, EvidenceFolderId,
    EvidenceId, Page, ReportId, ReportStatus, ReportSummary, ServiceStatus, SignedUrl,
};

use crate::traits::{AssessmentDirectory, AssociationError, Clock, EvidenceStore, Notifier, ObjectStorage, ReportService};

/// Serializable description of an Audit Manager account, used to seed
/// [`InMemoryAuditManager`] from scenario fixtures.
#[derive(Clone, Debug, Deserialize)]
pub struct World {
    #[serde(default = "default_service_status")]
    pub service_status: String,
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    #[serde(default)]
    pub folders: Vec<EvidenceFolder>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    /// Status the created report shows on each successive listing; the last
    /// entry sticks. `null` entries hide the report from the listing.
    #[serde(default = "default_report_statuses")]
    pub report_statuses: Vec<Option<ReportStatus>>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

fn default_service_status() -> String {
    "ACTIVE".to_string()
}

fn default_report_statuses() -> Vec<Option<ReportStatus>> {
    vec![Some(ReportStatus::Complete)]
}

/// Calls observed by the in-memory service, in issue order.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    pub list_assessments: usize,
    pub list_folders: usize,
    pub list_evidence: usize,
    pub list_reports: usize,
    pub folder_associations: Vec<EvidenceFolderId>,
    pub batch_associations: Vec<(EvidenceFolderId, Vec<EvidenceId>)>,
    pub created_reports: Vec<(ReportId, String)>,
    pub report_url_calls: usize,
}

struct StoredReport {
    id: ReportId,
    script: VecDeque<Option<ReportStatus>>,
    current: Option<ReportStatus>,
}

impl StoredReport {
    /// Status for a fresh listing; advances the script.
    fn observe(&mut self) -> Option<ReportStatus> {
        self.current = self.script.front().cloned().flatten();
        if self.script.len() > 1 {
            self.script.pop_front();
        }
        self.current.clone()
    }
}

#[derive(Default)]
struct Inner {
    service_status: String,
    assessments: Vec<Assessment>,
    folders: Vec<EvidenceFolder>,
    evidence: HashMap<String, Vec<Evidence>>,
    report_script: Vec<Option<ReportStatus>>,
    reports: Vec<StoredReport>,
    /// Zero-based index of the batch association call that fails.
    fail_batch_call: Option<usize>,
    rejected_ids: Vec<EvidenceId>,
    calls: CallLog,
}

/// In-memory Audit Manager for tests and offline simulation.
pub struct InMemoryAuditManager {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl InMemoryAuditManager {
    pub fn new(page_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                service_status: default_service_status(),
                report_script: default_report_statuses(),
                ..Default::default()
            }),
            page_size: page_size.max(1),
        }
    }

    pub fn from_world(world: World) -> Self {
        let svc = Self::new(world.page_size.unwrap_or(1000));
        {
            let mut inner = svc.inner.lock().unwrap();
            inner.service_status = world.service_status;
            inner.assessments = world.assessments;
            inner.folders = world.folders;
            inner.report_script = world.report_statuses;
            for ev in world.evidence {
                inner.evidence.entry(ev.evidence_folder_id.0.clone()).or_default().push(ev);
            }
        }
        svc
    }

    pub fn set_service_status(&self, status: &str) {
        self.inner.lock().unwrap().service_status = status.to_string();
    }

    pub fn add_assessment(&self, assessment: Assessment) {
        self.inner.lock().unwrap().assessments.push(assessment);
    }

    pub fn add_folder(&self, folder: EvidenceFolder) {
        self.inner.lock().unwrap().folders.push(folder);
    }

    /// Files evidence under its own `evidence_folder_id`.
    pub fn add_evidence(&self, evidence: Evidence) {
        let folder_id = evidence.evidence_folder_id.clone();
        self.insert_evidence_into(&folder_id, evidence);
    }

    /// Files evidence under `folder_id` regardless of the folder it names.
    pub fn insert_evidence_into(&self, folder_id: &EvidenceFolderId, evidence: Evidence) {
        self.inner.lock().unwrap().evidence.entry(folder_id.0.clone()).or_default().push(evidence);
    }

    pub fn script_report_statuses(&self, statuses: Vec<Option<ReportStatus>>) {
        self.inner.lock().unwrap().report_script = statuses;
    }

    pub fn fail_batch_call(&self, index: usize) {
        self.inner.lock().unwrap().fail_batch_call = Some(index);
    }

    /// Ids the service reports as per-item association errors.
    pub fn reject_evidence(&self, id: EvidenceId) {
        self.inner.lock().unwrap().rejected_ids.push(id);
    }

    pub fn calls(&self) -> CallLog {
        self.inner.lock().unwrap().calls.clone()
    }

    fn paginate<T: Clone>(&self, items: &[T], next_token: Option<&str>) -> anyhow::Result<Page<T>> {
        let start = match next_token {
            None => 0,
            Some(t) => t.parse::<usize>().map_err(|_| anyhow!("invalid next token {:?}", t))?,
        };
        let end = (start + self.page_size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default().to_vec();
        if end < items.len() {
            Ok(Page::with_next(slice, end.to_string()))
        } else {
            Ok(Page::last(slice))
        }
    }
}

impl Default for InMemoryAuditManager {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl AssessmentDirectory for InMemoryAuditManager {
    fn account_status(&self) -> anyhow::Result<ServiceStatus> {
        Ok(ServiceStatus::parse(&self.inner.lock().unwrap().service_status))
    }

    fn list_assessments(&self, status: AssessmentStatus, next_token: Option<&str>) -> anyhow::Result<Page<AssessmentSummary>> {
        let matching: Vec<AssessmentSummary> = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.list_assessments += 1;
            inner
                .assessments
                .iter()
                .filter(|a| a.status == status)
                .map(|a| AssessmentSummary { id: a.id.clone(), name: a.name.clone(), status: a.status.clone() })
                .collect()
        };
        self.paginate(&matching, next_token)
    }

    fn get_assessment(&self, assessment_id: &AssessmentId) -> anyhow::Result<Assessment> {
        let inner = self.inner.lock().unwrap();
        inner
            .assessments
            .iter()
            .find(|a| &a.id == assessment_id)
            .cloned()
            .ok_or_else(|| anyhow!("ResourceNotFoundException: assessment {} does not exist", assessment_id))
    }
}

impl EvidenceStore for InMemoryAuditManager {
    fn list_evidence_folders(&self, assessment_id: &AssessmentId, next_token: Option<&str>) -> anyhow::Result<Page<EvidenceFolder>> {
        let folders: Vec<EvidenceFolder> = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.list_folders += 1;
            inner.folders.iter().filter(|f| &f.assessment_id == assessment_id).cloned().collect()
        };
        self.paginate(&folders, next_token)
    }

    fn list_evidence(&self, folder: &EvidenceFolder, next_token: Option<&str>) -> anyhow::Result<Page<Evidence>> {
        let evidence = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.list_evidence += 1;
            inner.evidence.get(folder.id.as_str()).cloned().unwrap_or_default()
        };
        self.paginate(&evidence, next_token)
    }
}

impl ReportService for InMemoryAuditManager {
    fn create_report(&self, assessment_id: &AssessmentId, name: &str, _description: &str) -> anyhow::Result<ReportId> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.assessments.iter().any(|a| &a.id == assessment_id) {
            bail!("ResourceNotFoundException: assessment {} does not exist", assessment_id);
        }
        let id = ReportId::new();
        let script = inner.report_script.iter().cloned().collect();
        inner.reports.push(StoredReport { id: id.clone(), script, current: None });
        inner.calls.created_reports.push((id.clone(), name.to_string()));
        debug!(report_id = %id, "created in-memory report");
        Ok(id)
    }

    fn list_reports(&self, next_token: Option<&str>) -> anyhow::Result<Page<ReportSummary>> {
        let visible: Vec<ReportSummary> = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.list_reports += 1;
            // only a fresh listing moves report state forward
            if next_token.is_none() {
                inner
                    .reports
                    .iter_mut()
                    .filter_map(|r| r.observe().map(|status| ReportSummary { id: r.id.clone(), status }))
                    .collect()
            } else {
                inner
                    .reports
                    .iter()
                    .filter_map(|r| r.current.clone().map(|status| ReportSummary { id: r.id.clone(), status }))
                    .collect()
            }
        };
        self.paginate(&visible, next_token)
    }

    fn associate_folder(&self, _assessment_id: &AssessmentId, folder_id: &EvidenceFolderId) -> anyhow::Result<()> {
        self.inner.lock().unwrap().calls.folder_associations.push(folder_id.clone());
        Ok(())
    }

    fn batch_associate(
        &self,
        _assessment_id: &AssessmentId,
        folder_id: &EvidenceFolderId,
        evidence_ids: &[EvidenceId],
    ) -> anyhow::Result<Vec<AssociationError>> {
        let mut inner = self.inner.lock().unwrap();
        let index = inner.calls.batch_associations.len();
        if inner.fail_batch_call == Some(index) {
            bail!("ThrottlingException: rate exceeded on batch {}", index);
        }
        if evidence_ids.len() > auditrep_core::ASSOCIATION_BATCH_LIMIT {
            bail!("ValidationException: at most {} evidence ids per call", auditrep_core::ASSOCIATION_BATCH_LIMIT);
        }
        inner.calls.batch_associations.push((folder_id.clone(), evidence_ids.to_vec()));
        let errors = evidence_ids
            .iter()
            .filter(|id| inner.rejected_ids.contains(id))
            .map(|id| AssociationError {
                evidence_id: id.clone(),
                code: "ValidationException".to_string(),
                message: "evidence already associated".to_string(),
            })
            .collect();
        Ok(errors)
    }

    fn report_url(&self, _assessment_id: &AssessmentId, report_id: &ReportId) -> anyhow::Result<SignedUrl> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.report_url_calls += 1;
        Ok(SignedUrl {
            hyperlink_name: format!("{}.zip", report_id),
            link: format!("https://example-bucket.s3.amazonaws.com/{}.zip?X-Amz-Signature=fake", report_id),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: Mutex<Vec<StoredObject>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

impl ObjectStorage for MemoryObjectStorage {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
        });
        Ok(())
    }
}

/// Notifier that records messages, optionally failing every publish.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, subject: &str, message: &str) -> anyhow::Result<()> {
        if self.fail {
            bail!("AuthorizationError: not authorized to publish");
        }
        self.messages.lock().unwrap().push((subject.to_string(), message.to_string()));
        Ok(())
    }
}

/// Clock whose `sleep` advances time instantly.
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { start: Instant::now(), offset: Mutex::new(Duration::ZERO), sleeps: Mutex::new(vec![]) }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditrep_core::{collect_pages, ControlSetId};

    fn assessment(id: &str, name: &str, status: AssessmentStatus) -> Assessment {
        Assessment { id: AssessmentId::from_str(id), name: name.into(), status, reports_destination: None }
    }

    #[test]
    fn test_new_service_is_empty_and_active() {
        let svc = InMemoryAuditManager::new(10);
        assert_eq!(svc.account_status().unwrap(), ServiceStatus::Active);
        let page = svc.list_assessments(AssessmentStatus::Active, None).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_list_assessments_filters_status_and_paginates() {
        let svc = InMemoryAuditManager::new(2);
        for i in 0..5 {
            svc.add_assessment(assessment(&format!("a{}", i), &format!("n{}", i), AssessmentStatus::Active));
        }
        svc.add_assessment(assessment("old", "old", AssessmentStatus::Inactive));

        let all = collect_pages(|t| svc.list_assessments(AssessmentStatus::Active, t)).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(svc.calls().list_assessments, 3);
    }

    #[test]
    fn test_report_script_advances_per_listing_and_sticks() {
        let svc = InMemoryAuditManager::new(10);
        svc.add_assessment(assessment("a1", "n", AssessmentStatus::Active));
        svc.script_report_statuses(vec![None, Some(ReportStatus::InProgress), Some(ReportStatus::Complete)]);
        let id = svc.create_report(&AssessmentId::from_str("a1"), "r", "d").unwrap();

        let status_of = |svc: &InMemoryAuditManager| {
            svc.list_reports(None).unwrap().items.into_iter().find(|r| r.id == id).map(|r| r.status)
        };
        assert_eq!(status_of(&svc), None);
        assert_eq!(status_of(&svc), Some(ReportStatus::InProgress));
        assert_eq!(status_of(&svc), Some(ReportStatus::Complete));
        assert_eq!(status_of(&svc), Some(ReportStatus::Complete));
    }

    #[test]
    fn test_create_report_requires_known_assessment() {
        let svc = InMemoryAuditManager::new(10);
        assert!(svc.create_report(&AssessmentId::from_str("missing"), "r", "d").is_err());
    }

    #[test]
    fn test_batch_associate_enforces_limit_and_records_calls() {
        let svc = InMemoryAuditManager::new(10);
        let folder = EvidenceFolderId::from_str("f1");
        let ids: Vec<EvidenceId> = (0..51).map(|i| EvidenceId::from_str(format!("e{}", i))).collect();
        assert!(svc.batch_associate(&AssessmentId::from_str("a"), &folder, &ids).is_err());
        svc.batch_associate(&AssessmentId::from_str("a"), &folder, &ids[..50]).unwrap();
        assert_eq!(svc.calls().batch_associations.len(), 1);
    }

    #[test]
    fn test_evidence_is_listed_per_folder() {
        let svc = InMemoryAuditManager::new(10);
        let folder = EvidenceFolder {
            id: EvidenceFolderId::from_str("f1"),
            name: "2024-01-01".into(),
            control_set_id: ControlSetId::from_str("cs"),
            assessment_id: AssessmentId::from_str("a1"),
        };
        svc.add_folder(folder.clone());
        svc.add_evidence(Evidence {
            id: EvidenceId::from_str("e1"),
            evidence_folder_id: folder.id.clone(),
            data_source: None,
            account_id: None,
            event_source: None,
            event_name: None,
            evidence_by_type: None,
            resources_included: vec![],
            attributes: Default::default(),
            compliance_check: None,
        });
        let page = svc.list_evidence(&folder, None).unwrap();
        assert_eq!(page.items.len(), 1);
        let folders = svc.list_evidence_folders(&AssessmentId::from_str("a1"), None).unwrap();
        assert_eq!(folders.items, vec![folder]);
    }

    #[test]
    fn test_manual_clock_records_sleeps() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        clock.sleep(Duration::from_secs(10));
        assert_eq!(clock.now() - t0, Duration::from_secs(10));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(10)]);
    }

    #[test]
    fn test_failing_notifier_errors() {
        assert!(RecordingNotifier::failing().publish("s", "m").is_err());
        let n = RecordingNotifier::new();
        n.publish("s", "m").unwrap();
        assert_eq!(n.messages(), vec![("s".to_string(), "m".to_string())]);
    }
}
