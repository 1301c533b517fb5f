use crate::{error::PipelineError, types::EvidenceFolder};

/// Narrows folders to the latest batch when `latest_only` is set.
///
/// Folder names sort as recency markers (descending); every folder sharing
/// the top name is kept, in input order. With `latest_only` off the input
/// is returned untouched.
pub fn select_folders(folders: Vec<EvidenceFolder>, latest_only: bool) -> Result<Vec<EvidenceFolder>, PipelineError> {
    if !latest_only {
        return Ok(folders);
    }
    let latest = folders
        .iter()
        .map(|f| f.name.as_str())
        .max()
        .ok_or(PipelineError::NoEvidenceFolders)?
        .to_string();
    Ok(folders.into_iter().filter(|f| f.name == latest).collect())
}
