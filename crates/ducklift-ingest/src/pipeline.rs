//! Ingestion orchestrator
//!
//! Drives the configured job list sequentially: folder entries are
//! aggregated then loaded, file entries are fetched, decoded, and loaded.
//! The run policy chosen in the settings decides, once and for all
//! entries, whether a failure aborts the run or is recorded and skipped.
//! In both cases the report names every entry that succeeded before any
//! abort.

use ducklift_common::{IngestError, Result};
use tracing::{error, info, warn};

use crate::aggregate::aggregate;
use crate::config::{ErrorPolicy, FileJob, FolderJob, Settings};
use crate::decode::decode;
use crate::remote::RemoteStore;
use crate::sink::{DuckDbSink, Payload};
use crate::source::fetch_file;

/// Where one job entry read its data from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    Folder(String),
    File(String),
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntrySource::Folder(id) => write!(f, "folder {id}"),
            EntrySource::File(id) => write!(f, "file {id}"),
        }
    }
}

/// Terminal state of one job entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// The target table was created or replaced
    Loaded {
        rows: usize,
        /// Files skipped inside the folder under the best-effort policy
        files_skipped: usize,
    },
    /// The entry failed; the target table was not touched
    Failed(String),
}

/// Outcome of one job entry
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub table_name: String,
    pub source: EntrySource,
    pub status: EntryStatus,
}

impl EntryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, EntryStatus::Loaded { .. })
    }
}

/// Per-entry outcomes of one orchestrator run
#[derive(Debug, Default)]
pub struct RunReport {
    pub entries: Vec<EntryOutcome>,
}

impl RunReport {
    /// True when every processed entry loaded its table
    pub fn is_success(&self) -> bool {
        self.entries.iter().all(EntryOutcome::is_success)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entries.iter().filter(|e| e.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entries.iter().filter(|e| !e.is_success())
    }

    /// Human-readable per-entry summary
    pub fn summary(&self) -> String {
        if self.entries.is_empty() {
            return "no ingestion entries were processed".to_string();
        }

        let mut lines = Vec::with_capacity(self.entries.len() + 1);
        lines.push(format!(
            "{} succeeded, {} failed",
            self.succeeded().count(),
            self.failed().count()
        ));
        for entry in &self.entries {
            match &entry.status {
                EntryStatus::Loaded {
                    rows,
                    files_skipped,
                } => {
                    let skipped = if *files_skipped > 0 {
                        format!(", {files_skipped} files skipped")
                    } else {
                        String::new()
                    };
                    lines.push(format!(
                        "  ok     {} ({}): {rows} rows{skipped}",
                        entry.table_name, entry.source
                    ));
                },
                EntryStatus::Failed(err) => {
                    lines.push(format!(
                        "  failed {} ({}): {err}",
                        entry.table_name, entry.source
                    ));
                },
            }
        }
        lines.join("\n")
    }
}

/// Run every configured ingestion entry against the store and sink
///
/// Returns the per-entry report; the only run-level error is the
/// `fail_on_empty` policy rejecting a run that did no work. Entry
/// failures live in the report so callers can surface partial success.
pub async fn run_ingest<S: RemoteStore + ?Sized>(
    store: &S,
    sink: &DuckDbSink,
    settings: &Settings,
) -> Result<RunReport> {
    let policy = settings.run;
    let mut report = RunReport::default();

    let Some(jobs) = settings.drive_jobs() else {
        warn!("No drive ingestion configured in settings");
        return finish(report, policy.fail_on_empty);
    };

    let folders = jobs.folders.as_deref().unwrap_or_else(|| {
        warn!("No drive folders specified in settings");
        &[]
    });
    let files = jobs.files.as_deref().unwrap_or_else(|| {
        warn!("No drive files specified in settings");
        &[]
    });

    for folder in folders {
        let outcome = process_folder(store, sink, folder, settings).await;
        let failed = !outcome.is_success();
        report.entries.push(outcome);
        if failed && policy.on_error == ErrorPolicy::FailFast {
            return abort(report);
        }
    }

    for file in files {
        let outcome = process_file(store, sink, file).await;
        let failed = !outcome.is_success();
        report.entries.push(outcome);
        if failed && policy.on_error == ErrorPolicy::FailFast {
            return abort(report);
        }
    }

    finish(report, policy.fail_on_empty)
}

async fn process_folder<S: RemoteStore + ?Sized>(
    store: &S,
    sink: &DuckDbSink,
    job: &FolderJob,
    settings: &Settings,
) -> EntryOutcome {
    info!(
        folder_id = %job.id,
        table_name = %job.table_name,
        "Processing folder entry"
    );

    let result = async {
        let scan = aggregate(
            store,
            &job.id,
            job.file_format,
            job.pattern.as_deref(),
            &job.config,
            settings.run.on_error,
            settings.run.column_policy,
        )
        .await?;
        let rows = sink.load(&job.table_name, Payload::Table(scan.table))?;
        Ok::<_, IngestError>((rows, scan.failures.len()))
    }
    .await;

    entry_outcome(
        job.table_name.clone(),
        EntrySource::Folder(job.id.clone()),
        result,
    )
}

async fn process_file<S: RemoteStore + ?Sized>(
    store: &S,
    sink: &DuckDbSink,
    job: &FileJob,
) -> EntryOutcome {
    info!(
        file_id = %job.id,
        table_name = %job.table_name,
        "Processing file entry"
    );

    let result = async {
        let bytes = fetch_file(store, &job.id).await?;
        let table = decode(&bytes, job.file_format, &job.config)?;
        let rows = sink.load(&job.table_name, Payload::Table(table))?;
        Ok::<_, IngestError>((rows, 0))
    }
    .await;

    entry_outcome(
        job.table_name.clone(),
        EntrySource::File(job.id.clone()),
        result,
    )
}

fn entry_outcome(
    table_name: String,
    source: EntrySource,
    result: Result<(usize, usize)>,
) -> EntryOutcome {
    match result {
        Ok((rows, files_skipped)) => EntryOutcome {
            table_name,
            source,
            status: EntryStatus::Loaded {
                rows,
                files_skipped,
            },
        },
        Err(err) => {
            error!(%table_name, %source, error = %err, "Entry failed");
            EntryOutcome {
                table_name,
                source,
                status: EntryStatus::Failed(err.to_string()),
            }
        },
    }
}

fn abort(report: RunReport) -> Result<RunReport> {
    // Surface what completed before the abort so operators can see
    // partial progress.
    info!(summary = %report.summary(), "Aborting run after entry failure");
    Ok(report)
}

fn finish(report: RunReport, fail_on_empty: bool) -> Result<RunReport> {
    if report.entries.is_empty() {
        if fail_on_empty {
            return Err(IngestError::config(
                "ingestion run performed no work and fail_on_empty is set",
            ));
        }
        warn!("Ingestion run performed no work");
    } else {
        info!(summary = %report.summary(), "Ingestion run finished");
    }
    Ok(report)
}
