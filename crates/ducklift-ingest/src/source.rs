//! File discovery and selection on the remote service
//!
//! Listing, glob filtering, and whole-file fetching. All three return
//! `Result` so the orchestrator's run policy decides what a remote failure
//! means; an empty listing or an empty match set is never an error here.

use ducklift_common::{IngestError, Result};
use glob::Pattern;
use tracing::{debug, info, warn};

use crate::remote::{RemoteFile, RemoteStore};

/// List the non-folder entries of a remote folder
///
/// An empty or unknown folder produces an empty vec with a warning so
/// operators notice silent no-ops.
pub async fn list_folder<S: RemoteStore + ?Sized>(
    store: &S,
    folder_id: &str,
) -> Result<Vec<RemoteFile>> {
    info!(folder_id, "Fetching files from remote folder");
    let files = store.list_children(folder_id).await?;

    if files.is_empty() {
        warn!(folder_id, "Folder is empty or does not exist");
    } else {
        info!(folder_id, count = files.len(), "Fetched folder listing");
    }

    Ok(files)
}

/// Filter a file set by a shell-glob pattern matched against full names
///
/// `None` or an empty pattern returns the input unchanged. Matching is
/// case-sensitive with standard glob semantics (`*`, `?`, `[seq]`).
pub fn filter_files(files: Vec<RemoteFile>, pattern: Option<&str>) -> Result<Vec<RemoteFile>> {
    let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
        debug!("No pattern provided, returning original file list");
        return Ok(files);
    };

    let matcher = Pattern::new(pattern).map_err(|e| IngestError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let filtered: Vec<RemoteFile> = files
        .into_iter()
        .filter(|file| matcher.matches(&file.name))
        .collect();

    if filtered.is_empty() {
        warn!(pattern, "No files match the pattern");
    } else {
        info!(pattern, count = filtered.len(), "Files matched the pattern");
    }

    Ok(filtered)
}

/// Read one remote file's entire content into memory
pub async fn fetch_file<S: RemoteStore + ?Sized>(store: &S, file_id: &str) -> Result<Vec<u8>> {
    debug!(file_id, "Reading remote file as byte buffer");
    store.get_content(file_id).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<RemoteFile> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| RemoteFile {
                id: format!("id-{i}"),
                name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_filter_without_pattern_is_identity() {
        let input = files(&["a.csv", "b.xlsx"]);
        let out = filter_files(input.clone(), None).unwrap();
        assert_eq!(out, input);

        let out = filter_files(input.clone(), Some("")).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_filter_result_is_subset_of_input() {
        let input = files(&["jan_PCS_report.csv", "feb_PCS_report.csv", "notes.txt"]);
        let out = filter_files(input.clone(), Some("*PCS*")).unwrap();

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|f| input.contains(f)));
    }

    #[test]
    fn test_filter_glob_classes() {
        let input = files(&["a1.csv", "a2.csv", "b1.csv"]);

        let out = filter_files(input.clone(), Some("a?.csv")).unwrap();
        assert_eq!(out.len(), 2);

        let out = filter_files(input, Some("[ab]1.csv")).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let input = files(&["Report.CSV", "report.csv"]);
        let out = filter_files(input, Some("*.csv")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "report.csv");
    }

    #[test]
    fn test_filter_zero_matches_is_empty_not_error() {
        let input = files(&["a.csv"]);
        let out = filter_files(input, Some("*.xlsx")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_filter_invalid_pattern_is_error() {
        let input = files(&["a.csv"]);
        let err = filter_files(input, Some("[unclosed")).unwrap_err();
        assert!(matches!(err, IngestError::Pattern { .. }));
    }
}
