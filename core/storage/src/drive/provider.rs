//! Google Drive object store implementation.

use async_trait::async_trait;
use std::path::Path;

use clipferry_common::{Error, Result};

use crate::credentials::Credential;
use crate::provider::{ObjectStore, RemoteObject};

use super::client::DriveClient;

/// Google Drive object store.
pub struct DriveStore {
    client: DriveClient,
}

impl DriveStore {
    /// Create a new Drive store.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: DriveClient::new()?,
        })
    }
}

#[async_trait]
impl ObjectStore for DriveStore {
    fn name(&self) -> &str {
        "drive"
    }

    async fn upload(
        &self,
        local_path: &Path,
        display_name: &str,
        folder_id: &str,
        credential: &Credential,
    ) -> Result<RemoteObject> {
        let data = tokio::fs::read(local_path).await.map_err(Error::Io)?;

        tracing::debug!(
            name = display_name,
            bytes = data.len(),
            "Uploading staged media to Drive"
        );

        let file = self
            .client
            .upload_multipart(display_name, folder_id, data, &credential.access_token)
            .await?;

        let size = file.size_bytes();
        Ok(RemoteObject {
            id: file.id,
            name: file.name,
            size,
        })
    }
}
