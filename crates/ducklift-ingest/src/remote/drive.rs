//! HTTP client for a Drive-style file-storage API
//!
//! Authentication is the collaborator's concern: the client carries a
//! pre-issued bearer token and never refreshes credentials itself.

use async_trait::async_trait;
use ducklift_common::{IngestError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{RemoteFile, RemoteStore};

/// Default timeout for API requests in seconds.
/// Can be overridden via DUCKLIFT_API_TIMEOUT_SECS.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 300;

/// Default API base URL when not specified via environment variable.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// MIME type marking folder entries, which listings must exclude.
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Response envelope of the file-listing endpoint
#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

/// HTTP client for the remote file-storage service
pub struct DriveClient {
    client: Client,
    base_url: String,
    token: String,
}

impl DriveClient {
    /// Create a new client with an explicit base URL and bearer token
    pub fn new(base_url: String, token: String) -> Result<Self> {
        let timeout_secs = resolve_timeout_secs(std::env::var("DUCKLIFT_API_TIMEOUT_SECS").ok());

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| IngestError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Create a client from environment variables
    ///
    /// - `DUCKLIFT_DRIVE_URL`: API base URL (defaults to the public endpoint)
    /// - `DUCKLIFT_DRIVE_TOKEN`: bearer token (required)
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("DUCKLIFT_DRIVE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let token = std::env::var("DUCKLIFT_DRIVE_TOKEN").map_err(|_| {
            IngestError::config(
                "DUCKLIFT_DRIVE_TOKEN is not set. Export a bearer token for the remote service.",
            )
        })?;

        Self::new(base_url, token)
    }

    fn list_url(&self) -> String {
        format!("{}/files", self.base_url)
    }

    fn content_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.base_url, file_id)
    }
}

/// Resolve the request timeout from an optional env value, warning rather
/// than silently ignoring an unparsable override.
fn resolve_timeout_secs(raw: Option<String>) -> u64 {
    match raw {
        Some(raw) => match raw.parse() {
            Ok(secs) => secs,
            Err(_) => {
                warn!(
                    value = %raw,
                    default = DEFAULT_API_TIMEOUT_SECS,
                    "DUCKLIFT_API_TIMEOUT_SECS is not a valid number of seconds, using default"
                );
                DEFAULT_API_TIMEOUT_SECS
            },
        },
        None => DEFAULT_API_TIMEOUT_SECS,
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let query = format!("'{folder_id}' in parents and mimeType != '{FOLDER_MIME_TYPE}'");
        debug!(folder_id, "Listing remote folder");

        let response = self
            .client
            .get(self.list_url())
            .bearer_auth(&self.token)
            .query(&[("q", query.as_str()), ("fields", "files(id, name)")])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IngestError::Listing {
                folder_id: folder_id.to_string(),
                message: e.to_string(),
            })?;

        let listing: FileListResponse =
            response.json().await.map_err(|e| IngestError::Listing {
                folder_id: folder_id.to_string(),
                message: format!("Invalid listing response: {e}"),
            })?;

        Ok(listing.files)
    }

    async fn get_content(&self, file_id: &str) -> Result<Vec<u8>> {
        debug!(file_id, "Fetching remote file content");

        let response = self
            .client
            .get(self.content_url(file_id))
            .bearer_auth(&self.token)
            .query(&[("alt", "media")])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IngestError::Fetch {
                file_id: file_id.to_string(),
                message: e.to_string(),
            })?;

        let bytes = response.bytes().await.map_err(|e| IngestError::Fetch {
            file_id: file_id.to_string(),
            message: e.to_string(),
        })?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_contains};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DriveClient {
        DriveClient::new(server.uri(), "test-token".to_string()).unwrap()
    }

    #[test]
    fn test_resolve_timeout_secs() {
        assert_eq!(resolve_timeout_secs(None), DEFAULT_API_TIMEOUT_SECS);
        assert_eq!(resolve_timeout_secs(Some("10".to_string())), 10);
        // Unparsable overrides fall back to the default.
        assert_eq!(
            resolve_timeout_secs(Some("ten".to_string())),
            DEFAULT_API_TIMEOUT_SECS
        );
        assert_eq!(
            resolve_timeout_secs(Some("-5".to_string())),
            DEFAULT_API_TIMEOUT_SECS
        );
    }

    #[tokio::test]
    async fn test_list_children_parses_entries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param_contains("q", "'folder-1' in parents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [
                    {"id": "f1", "name": "a.csv"},
                    {"id": "f2", "name": "b.csv"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let files = client_for(&mock_server)
            .list_children("folder-1")
            .await
            .unwrap();

        assert_eq!(
            files,
            vec![
                RemoteFile {
                    id: "f1".into(),
                    name: "a.csv".into()
                },
                RemoteFile {
                    id: "f2".into(),
                    name: "b.csv".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_children_query_excludes_folders() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param_contains(
                "q",
                "mimeType != 'application/vnd.google-apps.folder'",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let files = client_for(&mock_server).list_children("f").await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_list_children_server_error_is_listing_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .list_children("broken")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Listing { ref folder_id, .. } if folder_id == "broken"));
    }

    #[tokio::test]
    async fn test_get_content_returns_raw_bytes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files/f1"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x,y\n1,2\n".to_vec()))
            .mount(&mock_server)
            .await;

        let bytes = client_for(&mock_server).get_content("f1").await.unwrap();
        assert_eq!(bytes, b"x,y\n1,2\n");
    }

    #[tokio::test]
    async fn test_get_content_not_found_is_fetch_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .get_content("missing")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Fetch { ref file_id, .. } if file_id == "missing"));
    }
}
