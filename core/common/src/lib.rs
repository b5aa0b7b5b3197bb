//! Common utilities and types shared across Clipferry modules.
//!
//! This module provides foundational types that are used throughout the
//! codebase, ensuring consistency and type safety.

pub mod error;
pub mod types;

pub use error::{Error, FailureKind, Result};
pub use types::{TransferRequest, TransferResult};
