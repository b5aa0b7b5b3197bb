//! Clipferry transfer orchestration.
//!
//! This module sequences one media relay end to end:
//! - Temp staging with purge-then-allocate under a per-namespace lock
//! - Media extraction through an external engine (yt-dlp)
//! - Credential acquisition and the authenticated upload
//! - Unconditional staging cleanup and structured result mapping

pub mod engine;
pub mod extract;
pub mod staging;

pub use engine::{TransferConfig, TransferEngine};
pub use extract::{ExtractedMedia, Extractor, YtDlpExtractor};
pub use staging::{StagedArtifact, StagingLease, TempStore};
