//! Local staging area for in-flight media artifacts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use clipferry_common::{Error, Result};

/// A staged media file, owned by exactly one transfer for its duration.
#[derive(Debug, Clone)]
pub struct StagedArtifact {
    /// Location of the staged file.
    pub path: PathBuf,
    /// Media container extension the extractor reported.
    pub extension: String,
    /// Size of the staged file.
    pub size_bytes: u64,
}

/// Exclusive claim on a staging namespace plus a fresh output path.
///
/// The namespace gate is held until the lease drops, so no other transfer can
/// purge or allocate in this namespace mid-flight. Hold it until the staged
/// artifact has been released.
pub struct StagingLease {
    path: PathBuf,
    _gate: OwnedMutexGuard<()>,
}

impl StagingLease {
    /// The collision-free output path allocated for this transfer.
    ///
    /// The path carries no extension; the extractor appends one.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Staging directory manager.
///
/// Purge-then-allocate alone is not race-free, so each namespace is guarded
/// by its own lock and transfers against one namespace are serialized.
pub struct TempStore {
    root: PathBuf,
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TempStore {
    /// Create a staging manager rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Claim the namespace, purge prior residue, and allocate a fresh path.
    ///
    /// Every existing entry under the namespace is removed best-effort; an
    /// individual removal failure is logged and does not abort the sweep. The
    /// returned path is derived from a random identifier, never from
    /// caller-supplied names.
    ///
    /// # Errors
    /// - The namespace directory itself cannot be created
    pub async fn prepare(&self, namespace: &str) -> Result<StagingLease> {
        let gate = self.gate_for(namespace).await;
        let guard = gate.lock_owned().await;

        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir).await.map_err(Error::Io)?;

        sweep(&dir).await;

        Ok(StagingLease {
            path: dir.join(Uuid::new_v4().to_string()),
            _gate: guard,
        })
    }

    /// Remove a staged artifact's file.
    ///
    /// Removal failures are logged, never propagated: cleanup must not mask
    /// the outcome of the transfer it runs after. Calling this twice for the
    /// same artifact is a no-op the second time.
    pub async fn release(&self, artifact: &StagedArtifact) {
        match fs::remove_file(&artifact.path).await {
            Ok(()) => {
                tracing::debug!(path = %artifact.path.display(), "Staged artifact released");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %artifact.path.display(), "Staged artifact already gone");
            }
            Err(e) => {
                tracing::warn!(
                    path = %artifact.path.display(),
                    error = %e,
                    "Failed to remove staged artifact"
                );
            }
        }
    }

    /// Purge everything under a lease's namespace.
    ///
    /// For aborted transfers whose extractor may have left partial output
    /// under names the caller never learned. The lease still holds the
    /// namespace gate, so the sweep cannot race another transfer.
    pub async fn discard(&self, lease: &StagingLease) {
        if let Some(dir) = lease.path().parent() {
            sweep(dir).await;
        }
    }

    async fn gate_for(&self, namespace: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        gates
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Best-effort removal of every entry under the staging namespace.
async fn sweep(dir: &Path) {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to scan staging namespace");
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to scan staging namespace");
                break;
            }
        };

        let path = entry.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };

        if let Err(e) = removed {
            tracing::warn!(path = %path.display(), error = %e, "Failed to purge staged entry");
        } else {
            tracing::debug!(path = %path.display(), "Purged stale staged entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn entry_count(dir: &Path) -> usize {
        let mut count = 0;
        let mut entries = fs::read_dir(dir).await.unwrap();
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn test_prepare_creates_namespace() {
        let temp = TempDir::new().unwrap();
        let store = TempStore::new(temp.path());

        let lease = store.prepare("downloads").await.unwrap();
        assert!(lease.path().starts_with(temp.path().join("downloads")));
        assert!(temp.path().join("downloads").is_dir());
    }

    #[tokio::test]
    async fn test_prepare_purges_prior_residue() {
        let temp = TempDir::new().unwrap();
        let store = TempStore::new(temp.path());

        let dir = temp.path().join("downloads");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("stale-1.mp4"), b"old").await.unwrap();
        fs::create_dir_all(dir.join("stale-dir")).await.unwrap();

        let _lease = store.prepare("downloads").await.unwrap();
        assert_eq!(entry_count(&dir).await, 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = TempStore::new(temp.path());

        let lease = store.prepare("downloads").await.unwrap();
        let path = lease.path().with_extension("mp4");
        fs::write(&path, b"media").await.unwrap();

        let artifact = StagedArtifact {
            path,
            extension: "mp4".to_string(),
            size_bytes: 5,
        };

        store.release(&artifact).await;
        assert!(!artifact.path.exists());

        // Second release of the same path is a no-op.
        store.release(&artifact).await;
    }

    #[tokio::test]
    async fn test_discard_purges_unregistered_residue() {
        let temp = TempDir::new().unwrap();
        let store = TempStore::new(temp.path());

        let lease = store.prepare("downloads").await.unwrap();
        // Partial output under a name the caller never learned.
        fs::write(lease.path().with_extension("mp4.part"), b"partial")
            .await
            .unwrap();

        store.discard(&lease).await;
        assert_eq!(entry_count(temp.path().join("downloads").as_path()).await, 0);
    }

    #[tokio::test]
    async fn test_prepare_serializes_one_namespace() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(TempStore::new(temp.path()));

        let lease = store.prepare("downloads").await.unwrap();
        let staged = lease.path().with_extension("mp4");
        fs::write(&staged, b"in flight").await.unwrap();

        let contender = {
            let store = store.clone();
            tokio::spawn(async move { store.prepare("downloads").await.unwrap() })
        };

        // The second prepare must wait while the first lease is held, so the
        // in-flight artifact cannot be purged from under its transfer.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());
        assert!(staged.exists());

        drop(lease);
        let second = contender.await.unwrap();

        // The contender swept the namespace before allocating.
        assert!(!staged.exists());
        assert_eq!(entry_count(temp.path().join("downloads").as_path()).await, 0);
        drop(second);
    }

    #[tokio::test]
    async fn test_distinct_namespaces_do_not_block() {
        let temp = TempDir::new().unwrap();
        let store = TempStore::new(temp.path());

        let _first = store.prepare("a").await.unwrap();
        // Would deadlock if namespaces shared one gate.
        let _second = store.prepare("b").await.unwrap();
    }

    #[tokio::test]
    async fn test_allocated_paths_never_repeat() {
        let temp = TempDir::new().unwrap();
        let store = TempStore::new(temp.path());

        let first = store.prepare("downloads").await.unwrap().path().to_path_buf();
        let second = store.prepare("downloads").await.unwrap().path().to_path_buf();
        assert_ne!(first, second);
    }
}
