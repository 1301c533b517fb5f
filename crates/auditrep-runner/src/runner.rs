use anyhow::{Context, Result};
use tracing::{info, warn};

use auditrep_core::{
    association_batches, collect_pages, drop_not_applicable, new_report_name, select_folders, Assessment, AssessmentId,
    AssessmentStatus, Evidence, EvidenceFolder, EvidenceFolderId, EvidenceId, ExportLocation, FilterCriteria,
    PipelineError, PollOutcome, ReportId, RunOutcome, RunSummary, SignedUrl, ASSOCIATION_BATCH_LIMIT,
};
use auditrep_export::{export_key, render_evidence_csv, CSV_CONTENT_TYPE};
use auditrep_services::{AssessmentDirectory, Clock, EvidenceStore, Notifier, ObjectStorage, ReportService};

use crate::{doctor::doctor, report::wait_for_report, Config};

/// SNS rejects subjects longer than this.
const MAX_SUBJECT_LEN: usize = 100;

/// What to generate: one assessment, one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRequest {
    pub assessment_name: String,
    pub criteria: FilterCriteria,
    pub latest_only: bool,
}

impl RunRequest {
    pub fn new(assessment_name: impl Into<String>, criteria: FilterCriteria, latest_only: bool) -> Result<Self, PipelineError> {
        let assessment_name = assessment_name.into().trim().to_string();
        if assessment_name.is_empty() {
            return Err(PipelineError::Config("assessment name is required".to_string()));
        }
        Ok(Self { assessment_name, criteria, latest_only })
    }
}

/// Evidence gathered across folders, in folder then fetch order.
#[derive(Clone, Debug, Default)]
pub struct RunAccumulator {
    pub evidence: Vec<Evidence>,
    pub summary: RunSummary,
}

pub struct Runner<'a> {
    pub cfg: &'a Config,
    pub directory: &'a dyn AssessmentDirectory,
    pub evidence: &'a dyn EvidenceStore,
    pub reports: &'a dyn ReportService,
    pub objects: &'a dyn ObjectStorage,
    pub notifier: Option<&'a dyn Notifier>,
    pub clock: &'a dyn Clock,
}

impl<'a> Runner<'a> {
    /// Wires a runner whose audit manager seams are all served by `backend`.
    pub fn new<B>(cfg: &'a Config, backend: &'a B, objects: &'a dyn ObjectStorage, clock: &'a dyn Clock) -> Self
    where
        B: AssessmentDirectory + EvidenceStore + ReportService,
    {
        Self { cfg, directory: backend, evidence: backend, reports: backend, objects, notifier: None, clock }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Full pipeline: resolve the assessment, associate the selected evidence,
    /// create the report, export the evidence CSV, then wait for the report.
    pub fn run(&self, req: &RunRequest) -> Result<RunOutcome> {
        doctor(self.directory)?;

        let assessment_id = self.find_assessment_id(&req.assessment_name)?;
        info!(assessment = %req.assessment_name, %assessment_id, "assessment found");

        let folders = self.list_folders(&assessment_id)?;
        let folders = select_folders(folders, req.latest_only)?;
        info!(count = folders.len(), latest_only = req.latest_only, "evidence folders to process");

        let mut acc = RunAccumulator::default();
        for folder in &folders {
            acc = self.process_folder(&assessment_id, folder, &req.criteria, acc)?;
        }

        info!("generating report");
        let report_id = self
            .reports
            .create_report(&assessment_id, &new_report_name(), &self.cfg.report.description)
            .with_context(|| format!("create report for assessment {}", assessment_id))?;
        info!(%report_id, "assessment report generation initiated");

        let assessment = self
            .directory
            .get_assessment(&assessment_id)
            .with_context(|| format!("get assessment {}", assessment_id))?;
        acc.summary.export = self.export_evidence(&assessment, &req.assessment_name, &report_id, &acc.evidence)?;
        acc.summary.evidence_exported = acc.evidence.len();

        let summary = acc.summary;
        match wait_for_report(self.reports, self.clock, &self.cfg.poll_policy(), &report_id)? {
            PollOutcome::Complete => {
                let url = self.resolve_url(&assessment_id, &req.assessment_name, &report_id)?;
                Ok(RunOutcome::Complete { report_id, url, summary })
            }
            PollOutcome::Failed => Ok(RunOutcome::Failed { report_id, summary }),
            PollOutcome::TimedOut => Ok(RunOutcome::TimedOut { report_id, summary }),
        }
    }

    /// Searches every page of ACTIVE assessments for an exact name match.
    pub fn find_assessment_id(&self, name: &str) -> Result<AssessmentId> {
        let assessments = collect_pages(|t| self.directory.list_assessments(AssessmentStatus::Active, t))
            .context("list active assessments")?;
        assessments
            .into_iter()
            .find(|a| a.name == name)
            .map(|a| a.id)
            .ok_or_else(|| PipelineError::AssessmentNotFound { name: name.to_string() }.into())
    }

    pub fn list_folders(&self, assessment_id: &AssessmentId) -> Result<Vec<EvidenceFolder>> {
        collect_pages(|t| self.evidence.list_evidence_folders(assessment_id, t))
            .with_context(|| format!("list evidence folders of assessment {}", assessment_id))
    }

    /// All evidence of one folder, minus NOT_APPLICABLE items and anything
    /// filed under a different folder.
    pub fn fetch_folder_evidence(&self, folder: &EvidenceFolder) -> Result<Vec<Evidence>> {
        info!(folder_id = %folder.id, "retrieving evidence details");
        let all = collect_pages(|t| self.evidence.list_evidence(folder, t))
            .with_context(|| format!("list evidence of folder {}", folder.id))?;
        let fetched = all.len();
        let applicable = drop_not_applicable(all);
        if applicable.len() < fetched {
            info!(folder_id = %folder.id, removed = fetched - applicable.len(), "removed evidence where compliance check is not applicable");
        }
        Ok(applicable
            .into_iter()
            .filter(|e| {
                let in_folder = e.evidence_folder_id == folder.id;
                if !in_folder {
                    warn!(evidence_id = %e.id, folder_id = %folder.id, listed_folder = %e.evidence_folder_id, "skipping evidence filed under another folder");
                }
                in_folder
            })
            .collect())
    }

    /// Associates one folder's evidence with the report and appends it to the
    /// accumulator. Without filters the folder is associated whole; with
    /// filters only the matching evidence ids are, in batches.
    pub fn process_folder(
        &self,
        assessment_id: &AssessmentId,
        folder: &EvidenceFolder,
        criteria: &FilterCriteria,
        mut acc: RunAccumulator,
    ) -> Result<RunAccumulator> {
        info!(folder_id = %folder.id, name = %folder.name, "processing evidence folder");
        let evidence = self.fetch_folder_evidence(folder)?;

        let selected = if criteria.is_active() {
            info!("processing evidence based on filters applied");
            let selected = criteria.apply(evidence);
            let ids: Vec<EvidenceId> = selected.iter().map(|e| e.id.clone()).collect();
            acc.summary.batch_calls += self.associate_batches(assessment_id, &folder.id, &ids)?;
            acc.summary.evidence_associated += ids.len();
            selected
        } else {
            info!(folder_id = %folder.id, "associating evidence folder");
            self.reports
                .associate_folder(assessment_id, &folder.id)
                .with_context(|| format!("associate evidence folder {}", folder.id))?;
            acc.summary.folder_associations += 1;
            acc.summary.evidence_associated += evidence.len();
            evidence
        };

        acc.evidence.extend(selected);
        acc.summary.folders_processed += 1;
        Ok(acc)
    }

    /// Issues one batch association per chunk, in order. Returns the number
    /// of calls made.
    pub fn associate_batches(&self, assessment_id: &AssessmentId, folder_id: &EvidenceFolderId, ids: &[EvidenceId]) -> Result<usize> {
        let batches = association_batches(ids, ASSOCIATION_BATCH_LIMIT);
        for (i, batch) in batches.iter().enumerate() {
            info!(folder_id = %folder_id, batch = i + 1, size = batch.len(), "associating processed evidence to assessment report");
            let errors = self
                .reports
                .batch_associate(assessment_id, folder_id, batch)
                .with_context(|| format!("associate evidence batch {} of folder {}", i + 1, folder_id))?;
            for e in errors {
                warn!(evidence_id = %e.evidence_id, code = %e.code, message = %e.message, "evidence not associated");
            }
        }
        Ok(batches.len())
    }

    /// Writes the evidence CSV next to the report, when the assessment has an
    /// S3 destination and export is enabled.
    pub fn export_evidence(
        &self,
        assessment: &Assessment,
        assessment_name: &str,
        report_id: &ReportId,
        evidence: &[Evidence],
    ) -> Result<Option<ExportLocation>> {
        if !self.cfg.export.enabled {
            info!("evidence export disabled");
            return Ok(None);
        }
        let Some(dest) = assessment.s3_destination() else {
            info!("unable to extract the target S3 bucket, skipping upload of evidence csv");
            return Ok(None);
        };
        let key = dest.key_for(&export_key(&self.cfg.export.key_prefix, assessment_name, report_id));
        let body = render_evidence_csv(evidence).context("render evidence csv")?;
        self.objects
            .put_object(&dest.bucket, &key, body, CSV_CONTENT_TYPE)
            .with_context(|| format!("upload evidence csv to s3://{}/{}", dest.bucket, key))?;
        info!(bucket = %dest.bucket, %key, rows = evidence.len(), "evidence csv uploaded");
        Ok(Some(ExportLocation { bucket: dest.bucket, key }))
    }

    /// Fetches the pre-signed URL and hands it to the notifier. Notification
    /// failures are logged and ignored.
    pub fn resolve_url(&self, assessment_id: &AssessmentId, assessment_name: &str, report_id: &ReportId) -> Result<SignedUrl> {
        let url = self
            .reports
            .report_url(assessment_id, report_id)
            .with_context(|| format!("get url of report {}", report_id))?;
        if let Some(notifier) = self.notifier {
            let subject: String = format!("audit manager report generator - {}", assessment_name)
                .chars()
                .take(MAX_SUBJECT_LEN)
                .collect();
            match serde_json::to_string_pretty(&url) {
                Ok(message) => {
                    if let Err(e) = notifier.publish(&subject, &message) {
                        warn!(error = %format!("{:#}", e), "could not publish report url");
                    }
                }
                Err(e) => warn!(error = %e, "could not encode report url notification"),
            }
        }
        Ok(url)
    }
}
