//! Object store trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use clipferry_common::Result;

use crate::credentials::Credential;

/// Metadata for an uploaded remote object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Durable provider-specific identifier.
    pub id: String,
    /// Display name the object was stored under.
    pub name: String,
    /// Size in bytes, when the provider reports it.
    pub size: Option<u64>,
}

/// Remote object store accepting authenticated uploads.
///
/// Implementations never cache credentials: the caller supplies a credential
/// that passed the validity check at the moment of use.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get the store name (e.g., "drive", "memory").
    fn name(&self) -> &str;

    /// Upload a local file under the given display name.
    ///
    /// # Preconditions
    /// - `local_path` exists and is readable
    /// - `credential` is valid at the moment of the call
    ///
    /// # Postconditions
    /// - The object exists under `folder_id` with the given name
    /// - Returns the durable remote reference
    ///
    /// # Errors
    /// - Remote rejection or transport failure
    /// - Local read failure
    async fn upload(
        &self,
        local_path: &Path,
        display_name: &str,
        folder_id: &str,
        credential: &Credential,
    ) -> Result<RemoteObject>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_object_serialization() {
        let object = RemoteObject {
            id: "abc123".to_string(),
            name: "clip1.mp4".to_string(),
            size: Some(1024),
        };

        let json = serde_json::to_string(&object).unwrap();
        let restored: RemoteObject = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id, object.id);
        assert_eq!(restored.name, object.name);
        assert_eq!(restored.size, object.size);
    }
}
