//! Common error types for Clipferry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for Clipferry operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input provided by the caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Media extraction failed (source unreachable or unsupported).
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Remote storage rejected or failed an upload.
    #[error("Upload error: {0}")]
    Upload(String),

    /// Consent exchange or state-token validation failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Token refresh/exchange transport failure.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Network transport failed.
    #[error("Network error: {0}")]
    Network(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An external call exceeded its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Map this error to the stable failure kind reported to callers.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::InvalidInput(_) => FailureKind::InvalidInput,
            Error::Extraction(_) => FailureKind::Extraction,
            Error::Upload(_) => FailureKind::Upload,
            Error::Authentication(_) => FailureKind::Authorization,
            Error::ExternalService(_) | Error::Network(_) => FailureKind::ExternalService,
            Error::Io(_) | Error::Serialization(_) => FailureKind::StorageIo,
            Error::Timeout(_) => FailureKind::Timeout,
        }
    }
}

/// Stable, caller-facing failure classification.
///
/// `AuthorizationRequired` is intentionally absent: a pending consent
/// round-trip is a control-flow branch of [`crate::TransferResult`], not a
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad or missing URL. User-correctable, no retry.
    InvalidInput,
    /// Source unreachable or unsupported. Upstream detail reported verbatim.
    Extraction,
    /// Remote storage rejected or failed the upload.
    Upload,
    /// State-token mismatch or consent exchange failure.
    Authorization,
    /// Token refresh/exchange transport failure. Not retried automatically.
    ExternalService,
    /// Local staging directory unusable.
    StorageIo,
    /// An external call exceeded its deadline. Safe to retry the transfer.
    Timeout,
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::InvalidInput("x".into()).kind(),
            FailureKind::InvalidInput
        );
        assert_eq!(Error::Extraction("x".into()).kind(), FailureKind::Extraction);
        assert_eq!(Error::Upload("x".into()).kind(), FailureKind::Upload);
        assert_eq!(
            Error::Authentication("x".into()).kind(),
            FailureKind::Authorization
        );
        assert_eq!(
            Error::Network("x".into()).kind(),
            FailureKind::ExternalService
        );
        assert_eq!(
            Error::Serialization("x".into()).kind(),
            FailureKind::StorageIo
        );
        assert_eq!(Error::Timeout("x".into()).kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert_eq!(err.kind(), FailureKind::StorageIo);
    }

    #[test]
    fn test_failure_kind_serialization() {
        let json = serde_json::to_string(&FailureKind::ExternalService).unwrap();
        assert_eq!(json, "\"external_service\"");

        let kind: FailureKind = serde_json::from_str("\"invalid_input\"").unwrap();
        assert_eq!(kind, FailureKind::InvalidInput);
    }
}
