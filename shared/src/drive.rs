//! Google Drive v3 client.
//!
//! Only the handful of read operations the site needs: listing folders and
//! files under a parent, exporting a Google Doc as plain text, reading file
//! metadata and downloading file content.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const FILE_FIELDS: &str = "id,name,mimeType,size,createdTime";
const SERVICE: &str = "Google Drive";

/// A file or folder as returned by the Drive API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Drive reports sizes as decimal strings
    pub size: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    pub fn is_document(&self) -> bool {
        self.mime_type == DOCUMENT_MIME_TYPE
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// Chunks of a downloaded file.
pub type FileStream = BoxStream<'static, Result<Bytes>>;

/// Read access to the file store backing the site.
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// Immediate sub-folders of `parent_id`, ordered by name.
    async fn list_folders(&self, parent_id: &str) -> Result<Vec<DriveFile>>;

    /// Non-folder children of `parent_id`, optionally restricted to one MIME
    /// type, ordered by creation time.
    async fn list_files(&self, parent_id: &str, mime_filter: Option<&str>) -> Result<Vec<DriveFile>>;

    /// Export a Google Doc as plain text.
    async fn export_document_text(&self, file_id: &str) -> Result<String>;

    async fn get_file_metadata(&self, file_id: &str) -> Result<DriveFile>;

    async fn stream_file(&self, file_id: &str) -> Result<FileStream>;
}

/// `DriveClient` backed by the public Drive REST API with an API key.
#[derive(Clone)]
pub struct GoogleDriveClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleDriveClient {
    pub fn new(http_client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http_client, api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_base_url(
        http_client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Run a `files.list` query, following pagination to the end.
    async fn query_files(&self, query: &str, order_by: &str) -> Result<Vec<DriveFile>> {
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/files?q={}&orderBy={}&fields={}&pageSize=1000&key={}",
                self.base_url,
                urlencoding::encode(query),
                urlencoding::encode(order_by),
                urlencoding::encode(&format!("nextPageToken,files({})", FILE_FIELDS)),
                urlencoding::encode(&self.api_key),
            );

            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let response = self.http_client.get(&url).send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(Error::upstream(
                    SERVICE,
                    format!("list failed ({}): {}", status, error_text),
                ));
            }

            let page: FileListResponse = response.json().await?;
            all_files.extend(page.files);

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!("Drive query {:?} returned {} files", query, all_files.len());
        Ok(all_files)
    }

    async fn get_ok(&self, url: &str, file_id: &str) -> Result<reqwest::Response> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Drive file {}", file_id)));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::upstream(
                SERVICE,
                format!("request for {} failed ({}): {}", file_id, status, error_text),
            ));
        }
        Ok(response)
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl DriveClient for GoogleDriveClient {
    async fn list_folders(&self, parent_id: &str) -> Result<Vec<DriveFile>> {
        let query = format!(
            "'{}' in parents and mimeType = '{}' and trashed = false",
            quote(parent_id),
            FOLDER_MIME_TYPE
        );
        self.query_files(&query, "name").await
    }

    async fn list_files(&self, parent_id: &str, mime_filter: Option<&str>) -> Result<Vec<DriveFile>> {
        let mut query = format!("'{}' in parents and trashed = false", quote(parent_id));
        match mime_filter {
            Some(mime) => query.push_str(&format!(" and mimeType = '{}'", quote(mime))),
            None => query.push_str(&format!(" and mimeType != '{}'", FOLDER_MIME_TYPE)),
        }
        self.query_files(&query, "createdTime").await
    }

    async fn export_document_text(&self, file_id: &str) -> Result<String> {
        let url = format!(
            "{}/files/{}/export?mimeType=text%2Fplain&key={}",
            self.base_url,
            urlencoding::encode(file_id),
            urlencoding::encode(&self.api_key),
        );
        let response = self.get_ok(&url, file_id).await?;
        Ok(response.text().await?)
    }

    async fn get_file_metadata(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!(
            "{}/files/{}?fields={}&key={}",
            self.base_url,
            urlencoding::encode(file_id),
            urlencoding::encode(FILE_FIELDS),
            urlencoding::encode(&self.api_key),
        );
        let response = self.get_ok(&url, file_id).await?;
        Ok(response.json().await?)
    }

    async fn stream_file(&self, file_id: &str) -> Result<FileStream> {
        let url = format!(
            "{}/files/{}?alt=media&key={}",
            self.base_url,
            urlencoding::encode(file_id),
            urlencoding::encode(&self.api_key),
        );
        let response = self.get_ok(&url, file_id).await?;
        Ok(response.bytes_stream().map_err(Error::from).boxed())
    }
}

/// Drain a file stream into memory, failing once more than `max_bytes`
/// have arrived.
pub async fn collect_stream(stream: FileStream, max_bytes: usize) -> Result<Vec<u8>> {
    stream
        .try_fold(Vec::new(), |mut buf, chunk| async move {
            if buf.len() + chunk.len() > max_bytes {
                return Err(Error::Validation(format!(
                    "file is larger than {} bytes",
                    max_bytes
                )));
            }
            buf.extend_from_slice(&chunk);
            Ok(buf)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(mime_type: &str) -> DriveFile {
        DriveFile {
            id: "f".to_string(),
            name: "f".to_string(),
            mime_type: mime_type.to_string(),
            size: Some("2048".to_string()),
            created_time: None,
        }
    }

    #[test]
    fn test_file_kinds() {
        assert!(file(DOCUMENT_MIME_TYPE).is_document());
        assert!(file("audio/mpeg").is_audio());
        assert!(file("image/jpeg").is_image());
        assert!(file(FOLDER_MIME_TYPE).is_folder());
        assert!(!file("application/pdf").is_image());
        assert_eq!(file("image/png").size_bytes(), Some(2048));
    }

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote("it's"), "it\\'s");
    }

    #[test]
    fn test_file_list_deserializes() {
        let json = r#"{
            "files": [
                {"id": "a", "name": "original", "mimeType": "application/vnd.google-apps.folder"},
                {"id": "b", "name": "notes", "mimeType": "application/vnd.google-apps.document",
                 "createdTime": "2024-03-01T12:00:00.000Z"}
            ],
            "nextPageToken": "tok"
        }"#;
        let page: FileListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.files.len(), 2);
        assert!(page.files[1].created_time.is_some());
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_collect_stream_concatenates_chunks() {
        let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let stream: FileStream = futures::stream::iter(chunks).boxed();
        assert_eq!(collect_stream(stream, 4).await.unwrap(), b"abcd".to_vec());
    }

    #[tokio::test]
    async fn test_collect_stream_stops_past_limit() {
        let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cde"))];
        let stream: FileStream = futures::stream::iter(chunks).boxed();
        let err = collect_stream(stream, 4).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
