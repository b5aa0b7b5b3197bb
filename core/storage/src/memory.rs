//! In-memory object store for tests.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use clipferry_common::{Error, Result};

use crate::credentials::Credential;
use crate::provider::{ObjectStore, RemoteObject};

/// One recorded upload.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub display_name: String,
    pub folder_id: String,
    pub size: u64,
}

/// In-memory object store that records uploads.
///
/// Supports failure injection so engine tests can exercise the upload-failure
/// path without a network.
#[derive(Default)]
pub struct MemoryStore {
    uploads: Mutex<Vec<RecordedUpload>>,
    fail_uploads: AtomicBool,
    stall: Mutex<Option<Duration>>,
    fixed_id: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Delay every subsequent upload, so deadline handling can be exercised.
    pub async fn stall_uploads(&self, delay: Duration) {
        *self.stall.lock().await = Some(delay);
    }

    /// Return this ID from subsequent uploads instead of a random one.
    pub async fn set_fixed_id(&self, id: impl Into<String>) {
        *self.fixed_id.lock().await = Some(id.into());
    }

    /// Get all recorded uploads.
    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().await.clone()
    }

    /// Get the number of recorded uploads.
    pub async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(
        &self,
        local_path: &Path,
        display_name: &str,
        folder_id: &str,
        credential: &Credential,
    ) -> Result<RemoteObject> {
        if !credential.is_valid() {
            return Err(Error::Authentication(
                "Credential is not valid for upload".to_string(),
            ));
        }

        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(Error::Upload("Injected upload failure".to_string()));
        }

        let stall = *self.stall.lock().await;
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }

        let data = tokio::fs::read(local_path).await.map_err(Error::Io)?;

        let upload = RecordedUpload {
            display_name: display_name.to_string(),
            folder_id: folder_id.to_string(),
            size: data.len() as u64,
        };
        self.uploads.lock().await.push(upload);

        let id = match self.fixed_id.lock().await.clone() {
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };

        Ok(RemoteObject {
            id,
            name: display_name.to_string(),
            size: Some(data.len() as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn valid_credential() -> Credential {
        Credential {
            access_token: "access".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
            scopes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_upload_records_entry() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("clip");
        tokio::fs::write(&file, b"media bytes").await.unwrap();

        let store = MemoryStore::new();
        store.set_fixed_id("abc123").await;

        let object = store
            .upload(&file, "clip1.mp4", "folder-1", &valid_credential())
            .await
            .unwrap();

        assert_eq!(object.id, "abc123");
        assert_eq!(store.upload_count().await, 1);
        assert_eq!(store.uploads().await[0].folder_id, "folder-1");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("clip");
        tokio::fs::write(&file, b"media").await.unwrap();

        let store = MemoryStore::new();
        store.fail_uploads(true);

        let result = store
            .upload(&file, "clip1.mp4", "folder-1", &valid_credential())
            .await;
        assert!(matches!(result, Err(Error::Upload(_))));
        assert_eq!(store.upload_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_credential_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("clip");
        tokio::fs::write(&file, b"media").await.unwrap();

        let mut credential = valid_credential();
        credential.expires_at = Utc::now() - Duration::hours(1);

        let store = MemoryStore::new();
        let result = store.upload(&file, "clip1.mp4", "f", &credential).await;
        assert!(matches!(result, Err(Error::Authentication(_))));
    }
}
