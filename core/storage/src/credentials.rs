//! Credential record and its persistence seam.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use zeroize::Zeroize;

use clipferry_common::{Error, Result};

/// Skew applied to expiry checks: a token expiring inside this window is
/// treated as already expired so it is never handed to an upload mid-flight.
const REFRESH_SKEW_MINUTES: i64 = 5;

/// An access/refresh token pair with expiration tracking.
///
/// Token strings are wiped on drop.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Access token for API requests.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens, when granted.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
    /// Scopes granted with this credential.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Check whether this credential can authenticate an upload right now.
    ///
    /// Validity = access token non-empty AND expiry beyond the refresh skew.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty()
            && self.expires_at > Utc::now() + Duration::minutes(REFRESH_SKEW_MINUTES)
    }

    /// Check whether a refresh can be attempted.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.access_token.zeroize();
        if let Some(token) = self.refresh_token.as_mut() {
            token.zeroize();
        }
    }
}

/// Persistence seam for the single credential record.
///
/// Mutation is driven exclusively by the credential lifecycle manager; the
/// store only reads and writes the record.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the current credential, if one is stored and parseable.
    ///
    /// A malformed stored record is treated as no credential, not a fatal
    /// error.
    async fn load(&self) -> Result<Option<Credential>>;

    /// Persist the credential record.
    async fn save(&self, credential: &Credential) -> Result<()>;
}

/// Credential store backed by a single JSON file.
///
/// The record is written readable/writable by the owning process only.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store at the given file path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };

        match serde_json::from_str(&content) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Stored credential is malformed, treating as absent"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(Error::Io)?;
        }

        let json = serde_json::to_string_pretty(credential)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(&self.path, json).await.map_err(Error::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms)
                .await
                .map_err(Error::Io)?;
        }

        Ok(())
    }
}

/// In-memory credential store for tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: tokio::sync::RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with a credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: tokio::sync::RwLock::new(Some(credential)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot.write().await = Some(credential.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_credential() -> Credential {
        Credential {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
            scopes: vec!["https://www.googleapis.com/auth/drive.file".to_string()],
        }
    }

    #[test]
    fn test_credential_validity() {
        assert!(valid_credential().is_valid());

        let mut expired = valid_credential();
        expired.expires_at = Utc::now() - Duration::hours(1);
        assert!(!expired.is_valid());

        let mut empty_token = valid_credential();
        empty_token.access_token = String::new();
        assert!(!empty_token.is_valid());
    }

    #[test]
    fn test_credential_near_expiry_is_invalid() {
        // Token expiring in 4 minutes falls inside the 5 minute skew.
        let mut credential = valid_credential();
        credential.expires_at = Utc::now() + Duration::minutes(4);
        assert!(!credential.is_valid());
    }

    #[test]
    fn test_credential_debug_redacts_tokens() {
        let mut credential = valid_credential();
        credential.access_token = "super-secret-access".to_string();
        credential.refresh_token = Some("super-secret-refresh".to_string());

        let debug = format!("{:?}", credential);
        assert!(!debug.contains("super-secret-access"));
        assert!(!debug.contains("super-secret-refresh"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp.path().join("credentials.json"));

        assert!(store.load().await.unwrap().is_none());

        store.save(&valid_credential()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.scopes.len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_malformed_record_loads_as_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("credentials.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("credentials.json");
        let store = FileCredentialStore::new(&path);
        store.save(&valid_credential()).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&valid_credential()).await.unwrap();
        assert!(store.load().await.unwrap().unwrap().is_valid());
    }
}
