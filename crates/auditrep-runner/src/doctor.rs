use anyhow::{Context, Result};
use tracing::info;

use auditrep_core::{PipelineError, ServiceStatus};
use auditrep_services::AssessmentDirectory;

/// Audit Manager must be enabled (ACTIVE) for the calling account before any
/// assessment call is attempted.
pub fn doctor(directory: &dyn AssessmentDirectory) -> Result<()> {
    let status = directory.account_status().context("get audit manager account status")?;
    if status != ServiceStatus::Active {
        return Err(PipelineError::ServiceInactive { status: status.as_str().to_string() }.into());
    }
    info!("audit manager account status is ACTIVE");
    Ok(())
}
