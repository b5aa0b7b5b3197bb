//! Transfer engine sequencing one media relay end to end.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use clipferry_common::{Error, FailureKind, TransferRequest, TransferResult};
use clipferry_storage::{CredentialManager, CredentialOutcome, ObjectStore};

use crate::extract::Extractor;
use crate::staging::{StagedArtifact, StagingLease, TempStore};

/// Configuration for the transfer engine.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TransferConfig {
    /// Staging namespace this engine transfers through.
    pub namespace: String,
    /// Destination folder in the remote store. Required; there is no default
    /// container.
    pub folder_id: String,
    /// Deadline applied to each external call (extraction, upload).
    pub deadline: Duration,
}

impl TransferConfig {
    /// Create a configuration for the given destination folder.
    pub fn new(folder_id: impl Into<String>) -> Self {
        Self {
            namespace: "transfers".to_string(),
            folder_id: folder_id.into(),
            deadline: Duration::from_secs(600),
        }
    }
}

/// Top-level transfer coordinator.
///
/// Sequences validate -> stage -> extract -> acquire credential -> upload,
/// releases the staged artifact on every exit path, and maps every failure to
/// a structured result. No error escapes `execute`.
pub struct TransferEngine {
    extractor: Arc<dyn Extractor>,
    object_store: Arc<dyn ObjectStore>,
    credentials: Arc<CredentialManager>,
    staging: TempStore,
    config: TransferConfig,
}

impl TransferEngine {
    /// Create a new engine.
    pub fn new(
        extractor: Arc<dyn Extractor>,
        object_store: Arc<dyn ObjectStore>,
        credentials: Arc<CredentialManager>,
        staging: TempStore,
        config: TransferConfig,
    ) -> Self {
        Self {
            extractor,
            object_store,
            credentials,
            staging,
            config,
        }
    }

    /// Get the credential lifecycle manager backing this engine.
    pub fn credentials(&self) -> Arc<CredentialManager> {
        self.credentials.clone()
    }

    /// Run one transfer.
    ///
    /// Upload is never attempted before extraction completed and a valid
    /// credential is held. The staging namespace holds no residue from this
    /// transfer once the call returns.
    pub async fn execute(&self, request: TransferRequest) -> TransferResult {
        if let Err(e) = request.validate() {
            return TransferResult::failed(FailureKind::InvalidInput, e.to_string());
        }

        tracing::info!(url = %request.source_url, "Starting transfer");

        let lease = match self.staging.prepare(&self.config.namespace).await {
            Ok(lease) => lease,
            Err(e) => return TransferResult::failed(FailureKind::StorageIo, e.to_string()),
        };

        let artifact = match self.stage_download(&request, &lease).await {
            Ok(artifact) => artifact,
            Err(result) => {
                // A failed or timed-out extraction can leave partial output
                // under names the engine never learned; purge the whole
                // namespace before the lease drops.
                self.staging.discard(&lease).await;
                return result;
            }
        };

        let result = self.relay(&request, &artifact).await;

        // Cleanup runs on every path, success or failure, and the namespace
        // lease is held until the artifact is gone.
        self.staging.release(&artifact).await;
        drop(lease);

        result
    }

    async fn stage_download(
        &self,
        request: &TransferRequest,
        lease: &StagingLease,
    ) -> std::result::Result<StagedArtifact, TransferResult> {
        let extraction = timeout(
            self.config.deadline,
            self.extractor.extract(&request.source_url, lease.path()),
        )
        .await;

        let media = match extraction {
            Err(_) => {
                return Err(TransferResult::failed(
                    FailureKind::Timeout,
                    "Extraction exceeded the configured deadline",
                ))
            }
            Ok(Err(Error::Timeout(detail))) => {
                return Err(TransferResult::failed(FailureKind::Timeout, detail))
            }
            Ok(Err(e)) => {
                // The engine's own detail is reported verbatim upstream.
                let detail = match e {
                    Error::Extraction(detail) => detail,
                    other => other.to_string(),
                };
                return Err(TransferResult::failed(FailureKind::Extraction, detail));
            }
            Ok(Ok(media)) => media,
        };

        tracing::debug!(
            path = %media.path.display(),
            extension = %media.extension,
            bytes = media.bytes_written,
            "Media staged"
        );

        Ok(StagedArtifact {
            path: media.path,
            extension: media.extension,
            size_bytes: media.bytes_written,
        })
    }

    async fn relay(&self, request: &TransferRequest, artifact: &StagedArtifact) -> TransferResult {
        let credential = match self.credentials.acquire().await {
            Ok(CredentialOutcome::Valid(credential)) => credential,
            Ok(CredentialOutcome::ConsentRequired { redirect_url }) => {
                tracing::info!("No usable credential, redirecting caller to consent");
                return TransferResult::AuthorizationRequired { redirect_url };
            }
            Err(e) => return TransferResult::failed(e.kind(), e.to_string()),
        };

        let display_name = resolve_display_name(request, artifact);

        let upload = timeout(
            self.config.deadline,
            self.object_store.upload(
                &artifact.path,
                &display_name,
                &self.config.folder_id,
                &credential,
            ),
        )
        .await;

        match upload {
            Err(_) => TransferResult::failed(
                FailureKind::Timeout,
                "Upload exceeded the configured deadline",
            ),
            Ok(Err(Error::Timeout(detail))) => {
                TransferResult::failed(FailureKind::Timeout, detail)
            }
            Ok(Err(e)) => {
                // The store's own rejection detail is reported verbatim; other
                // failures keep their taxonomy (a mid-upload 401 stays an
                // authorization failure).
                match e {
                    Error::Upload(detail) => TransferResult::failed(FailureKind::Upload, detail),
                    other => TransferResult::failed(other.kind(), other.to_string()),
                }
            }
            Ok(Ok(object)) => {
                tracing::info!(reference_id = %object.id, name = %object.name, "Transfer complete");
                TransferResult::Success {
                    reference_id: object.id,
                }
            }
        }
    }
}

/// Desired name when supplied, else the staged file's own name.
fn resolve_display_name(request: &TransferRequest, artifact: &StagedArtifact) -> String {
    match request.desired_name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => artifact
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("clip.{}", artifact.extension)),
    }
}
