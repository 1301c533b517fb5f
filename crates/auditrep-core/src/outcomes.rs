use crate::{ids::*, types::*};

/// Result of waiting on report generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Complete,
    Failed,
    /// Deadline passed while the report was still generating. The job keeps
    /// running server-side.
    TimedOut,
}

/// Where the evidence CSV was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportLocation {
    pub bucket: String,
    pub key: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub folders_processed: usize,
    pub folder_associations: usize,
    pub batch_calls: usize,
    pub evidence_associated: usize,
    pub evidence_exported: usize,
    pub export: Option<ExportLocation>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Complete { report_id: ReportId, url: SignedUrl, summary: RunSummary },
    Failed { report_id: ReportId, summary: RunSummary },
    TimedOut { report_id: ReportId, summary: RunSummary },
}

impl RunOutcome {
    pub fn report_id(&self) -> &ReportId {
        match self {
            RunOutcome::Complete { report_id, .. }
            | RunOutcome::Failed { report_id, .. }
            | RunOutcome::TimedOut { report_id, .. } => report_id,
        }
    }

    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Complete { summary, .. }
            | RunOutcome::Failed { summary, .. }
            | RunOutcome::TimedOut { summary, .. } => summary,
        }
    }
}
