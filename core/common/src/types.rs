//! Common types used throughout Clipferry.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FailureKind;

/// A single inbound transfer request.
///
/// Immutable; created once per inbound call and consumed by the transfer
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Remote video URL to fetch.
    pub source_url: String,
    /// Optional display name for the relayed object. When absent, a name is
    /// derived from the staged artifact.
    pub desired_name: Option<String>,
}

impl TransferRequest {
    /// Create a new transfer request.
    pub fn new(source_url: impl Into<String>, desired_name: Option<String>) -> Self {
        Self {
            source_url: source_url.into(),
            desired_name,
        }
    }

    /// Validate the source URL.
    ///
    /// # Postconditions
    /// - Returns the parsed URL on success
    ///
    /// # Errors
    /// - URL is empty, unparseable, or not http(s)
    pub fn validate(&self) -> crate::Result<Url> {
        if self.source_url.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Source URL cannot be empty".to_string(),
            ));
        }

        let url = Url::parse(&self.source_url)
            .map_err(|e| crate::Error::InvalidInput(format!("Unparseable source URL: {}", e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(crate::Error::InvalidInput(format!(
                "Unsupported URL scheme: {}",
                other
            ))),
        }
    }
}

/// Outcome of one transfer attempt, serialized with a `status` discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferResult {
    /// The media was relayed; `reference_id` is the durable remote ID.
    Success { reference_id: String },
    /// No usable credential; the caller must drive the consent redirect.
    AuthorizationRequired { redirect_url: String },
    /// The transfer failed. The message never contains credential material.
    Failed { kind: FailureKind, message: String },
}

impl TransferResult {
    /// Build a failure result.
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Check whether this result is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
