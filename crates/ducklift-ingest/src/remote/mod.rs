//! Remote file-storage abstraction
//!
//! The pipeline talks to the remote service exclusively through the
//! [`RemoteStore`] trait, so the orchestrator and aggregator can be
//! exercised against in-memory fakes while production runs use the
//! HTTP-backed [`drive::DriveClient`].

pub mod drive;

use async_trait::async_trait;
use ducklift_common::Result;
use serde::{Deserialize, Serialize};

/// A single non-folder entry on the remote service
///
/// Ephemeral: listed fresh on every run, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Capability contract of the remote file-storage service
///
/// Both operations return an explicit `Result`; whether a failure is
/// suppressed or aborts the run is the orchestrator's decision, not the
/// store's.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List the non-folder entries directly inside a folder
    ///
    /// No recursive descent. An existing-but-empty folder yields an empty
    /// vec, which is not an error.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>>;

    /// Read a file's entire content into memory
    async fn get_content(&self, file_id: &str) -> Result<Vec<u8>>;
}
