//! Declarative job configuration
//!
//! The settings document names what to ingest (folders and individual
//! files, each mapped to one target table) and how the run behaves on
//! failure. The analytical-store file path can additionally be resolved
//! from a dbt-style `profiles.yml`, so the ingestion and the downstream
//! modelling layer share one database file.

use ducklift_common::{ColumnPolicy, IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::decode::{DecodeOptions, FileFormat};

/// Top-level settings document
///
/// Missing `ingest` or source-kind keys are tolerated: the run then
/// performs zero work, and [`RunPolicy::fail_on_empty`] decides whether
/// that is a success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ingest: Option<IngestSection>,
    pub run: RunPolicy,
}

/// Jobs grouped by source kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    pub drive: Option<SourceJobs>,
}

/// The folder and file job lists for one source kind
///
/// Either list may be absent; a run ingesting only folders or only files
/// is legitimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceJobs {
    pub folders: Option<Vec<FolderJob>>,
    pub files: Option<Vec<FileJob>>,
}

/// One folder to aggregate into one target table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderJob {
    pub id: String,
    pub file_format: FileFormat,
    pub table_name: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub config: DecodeOptions,
}

/// One file to load into one target table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileJob {
    pub id: String,
    pub file_format: FileFormat,
    pub table_name: String,
    #[serde(default)]
    pub config: DecodeOptions,
}

/// What a per-entry or per-file failure means for the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort on the first failure, after reporting prior successes
    #[default]
    FailFast,
    /// Log the failure, record it in the run report, and continue
    BestEffort,
}

/// Run-level policy switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunPolicy {
    pub on_error: ErrorPolicy,
    /// Treat a run that performed zero ingestion work as a failure
    pub fail_on_empty: bool,
    /// Column handling when concatenating files within a folder
    pub column_policy: ColumnPolicy,
}

impl Settings {
    /// Load a settings document from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// The drive job lists, if any were configured
    pub fn drive_jobs(&self) -> Option<&SourceJobs> {
        self.ingest.as_ref().and_then(|section| section.drive.as_ref())
    }
}

/// Resolve the analytical-store file for a dbt environment
///
/// Looks up `main.outputs.<env>.path` in a dbt `profiles.yml`, so the
/// ingestion writes to the same database file the modelling layer reads.
pub fn database_path(env: &str, profiles_path: impl AsRef<Path>) -> Result<String> {
    let profiles_path = profiles_path.as_ref();
    let content = std::fs::read_to_string(profiles_path)?;
    let profiles: serde_yaml::Value = serde_yaml::from_str(&content)?;

    profiles
        .get("main")
        .and_then(|main| main.get("outputs"))
        .and_then(|outputs| outputs.get(env))
        .and_then(|output| output.get("path"))
        .and_then(|path| path.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            IngestError::config(format!(
                "Unsupported database environment '{env}' in {}",
                profiles_path.display()
            ))
        })
}
