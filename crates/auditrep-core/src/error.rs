use thiserror::Error;

/// Fatal conditions raised by the pipeline itself (as opposed to failures of
/// the underlying service calls, which propagate unchanged).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("audit manager is not active for this account (status: {status})")]
    ServiceInactive { status: String },

    #[error("assessment '{name}' not found among active assessments")]
    AssessmentNotFound { name: String },

    #[error("no evidence folders to select the latest batch from")]
    NoEvidenceFolders,

    #[error("create report returned no report id for assessment {assessment_id}")]
    MissingReportId { assessment_id: String },
}
