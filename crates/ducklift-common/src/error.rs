//! Error types for Ducklift

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Main error type for the ingestion pipeline
///
/// Every remote boundary surfaces failures through this enum; whether a
/// variant aborts the run or is logged and skipped is decided once by the
/// orchestrator's run policy, never inside a component.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}. Check the file syntax at the indicated line/column.")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to list folder '{folder_id}': {message}")]
    Listing { folder_id: String, message: String },

    #[error("Failed to fetch file '{file_id}': {message}")]
    Fetch { file_id: String, message: String },

    #[error("Unsupported file format: '{0}'. Supported formats are 'csv' and 'excel'.")]
    UnsupportedFormat(String),

    #[error("Unsupported payload type: {0}. Only tabular data and JSON mappings can be loaded.")]
    UnsupportedPayload(String),

    #[error("Failed to decode {format} content: {message}")]
    Decode { format: String, message: String },

    #[error("Column mismatch while concatenating tables: {0}")]
    ColumnMismatch(String),

    #[error("Invalid file pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Shorthand for a configuration error with a formatted message
    pub fn config(message: impl Into<String>) -> Self {
        IngestError::Config(message.into())
    }

    /// Shorthand for a database error with a formatted message
    pub fn database(message: impl Into<String>) -> Self {
        IngestError::Database(message.into())
    }
}
