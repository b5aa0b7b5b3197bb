//! Google Drive backend for Clipferry.
//!
//! This module provides the remote side of a transfer:
//! - OAuth2 consent and refresh flows with a single-slot authorization state
//! - Persisted credential lifecycle management
//! - Multipart uploads against the Drive v3 API

pub mod auth;
pub mod client;
pub mod provider;

pub use auth::{
    AuthConfig, AuthManager, ConsentGate, CredentialManager, CredentialOutcome, PendingConsent,
};
pub use client::{DriveClient, DriveFile};
pub use provider::DriveStore;
