//! Google Drive API client.

use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use clipferry_common::{Error, Result};

/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
/// Fields requested back from upload responses.
const DRIVE_FIELDS: &str = "id,name,size";
/// Multipart boundary for metadata+media uploads.
const BOUNDARY: &str = "ClipferryBoundary";

/// Google Drive file metadata from the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// File size in bytes. Drive reports it as a decimal string.
    #[serde(default)]
    pub size: Option<String>,
}

impl DriveFile {
    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Thin client over the Drive v3 upload endpoint.
pub struct DriveClient {
    http: Client,
}

impl DriveClient {
    /// Create a new Drive client.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent("Clipferry/0.1")
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    /// Upload a file in a single multipart request.
    ///
    /// # Errors
    /// - `Authentication` when Drive rejects the access token
    /// - `Upload` when Drive rejects the request for any other reason
    /// - `Network` on transport failure
    pub async fn upload_multipart(
        &self,
        name: &str,
        parent_id: &str,
        data: Vec<u8>,
        access_token: &str,
    ) -> Result<DriveFile> {
        let url = format!("{}/files?uploadType=multipart", DRIVE_UPLOAD_BASE);

        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id]
        });
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| Error::Serialization(format!("Failed to serialize metadata: {}", e)))?;

        let body = build_multipart_body(&metadata_json, &data);

        let response = self
            .http
            .post(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", access_token),
            )
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", BOUNDARY),
            )
            .query(&[("fields", DRIVE_FIELDS)])
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload file: {}", e)))?;

        self.handle_response(response).await
    }

    /// Map a Drive response onto the common taxonomy.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| Error::Serialization(format!("Invalid Drive response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED => Err(Error::Authentication(format!(
                "Drive rejected the access token: {}",
                body
            ))),
            _ => Err(Error::Upload(format!("Drive API error {}: {}", status, body))),
        }
    }
}

/// Build the multipart/related body: a JSON metadata part followed by the
/// media part.
fn build_multipart_body(metadata_json: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + metadata_json.len() + 256);

    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}--", BOUNDARY).as_bytes());

    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_file_size_parsing() {
        let file: DriveFile =
            serde_json::from_str(r#"{"id": "abc123", "name": "clip.mp4", "size": "2048"}"#)
                .unwrap();
        assert_eq!(file.size_bytes(), Some(2048));

        let no_size: DriveFile =
            serde_json::from_str(r#"{"id": "abc123", "name": "clip.mp4"}"#).unwrap();
        assert_eq!(no_size.size_bytes(), None);
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = build_multipart_body(r#"{"name":"clip.mp4"}"#, b"media bytes");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with(&format!("--{}\r\n", BOUNDARY)));
        assert!(text.contains(r#"{"name":"clip.mp4"}"#));
        assert!(text.contains("media bytes"));
        assert!(text.ends_with(&format!("--{}--", BOUNDARY)));
    }
}
