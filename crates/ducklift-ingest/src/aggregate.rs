//! Folder aggregation: discovery, per-file decode, concatenation
//!
//! One bad file must not block the good files in the same folder: under
//! the best-effort policy each file's failure is collected into a
//! side-channel report and the concatenation covers successes only.

use ducklift_common::{ColumnPolicy, Result, StructuredTable};
use tracing::{info, warn};

use crate::config::ErrorPolicy;
use crate::decode::{decode, DecodeOptions, FileFormat};
use crate::remote::{RemoteFile, RemoteStore};
use crate::source::{fetch_file, filter_files, list_folder};

/// A file that could not be fetched or decoded during a folder scan
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub file: RemoteFile,
    pub error: String,
}

/// Outcome of aggregating one folder
#[derive(Debug)]
pub struct FolderScan {
    /// Concatenation of all successfully decoded files, in listing order
    pub table: StructuredTable,
    /// Number of files that decoded successfully
    pub files_read: usize,
    /// Files skipped under the best-effort policy
    pub failures: Vec<FileFailure>,
}

/// Read all matching files of a folder into one table
///
/// Files are processed in listing order and row order is preserved;
/// per-file row indices are discarded by the concatenation. Zero surviving
/// files yield an empty table, never an error.
pub async fn aggregate<S: RemoteStore + ?Sized>(
    store: &S,
    folder_id: &str,
    format: FileFormat,
    pattern: Option<&str>,
    options: &DecodeOptions,
    on_error: ErrorPolicy,
    column_policy: ColumnPolicy,
) -> Result<FolderScan> {
    let files = list_folder(store, folder_id).await?;
    let files = filter_files(files, pattern)?;

    let mut tables = Vec::with_capacity(files.len());
    let mut failures = Vec::new();

    for file in files {
        match read_one(store, &file, format, options).await {
            Ok(table) => tables.push(table),
            Err(err) => match on_error {
                ErrorPolicy::FailFast => return Err(err),
                ErrorPolicy::BestEffort => {
                    warn!(
                        file_id = %file.id,
                        file_name = %file.name,
                        error = %err,
                        "Skipping file after failure"
                    );
                    failures.push(FileFailure {
                        file,
                        error: err.to_string(),
                    });
                },
            },
        }
    }

    if tables.is_empty() {
        warn!(
            folder_id,
            %format,
            pattern = pattern.unwrap_or("<none>"),
            ?options,
            "No files read from folder, returning empty table"
        );
        return Ok(FolderScan {
            table: StructuredTable::empty(),
            files_read: 0,
            failures,
        });
    }

    let files_read = tables.len();
    let table = StructuredTable::concat(tables, column_policy)?;
    info!(
        folder_id,
        files_read,
        rows = table.num_rows(),
        "Aggregated folder into a single table"
    );

    Ok(FolderScan {
        table,
        files_read,
        failures,
    })
}

async fn read_one<S: RemoteStore + ?Sized>(
    store: &S,
    file: &RemoteFile,
    format: FileFormat,
    options: &DecodeOptions,
) -> Result<StructuredTable> {
    let bytes = fetch_file(store, &file.id).await?;
    decode(&bytes, format, options)
}
