//! Remote object storage and credential lifecycle for Clipferry.
//!
//! This module provides a trait-based interface for the remote object store
//! (Google Drive, in-memory fake) together with the OAuth2 credential
//! lifecycle that authenticates uploads.
//!
//! # Design Principles
//! - Provider isolation: no Drive-specific logic leaks into the transfer engine
//! - Async operations: all I/O operations are async
//! - Injected persistence: the credential store is a trait so tests can
//!   substitute an in-memory fake
//! - Unified error semantics: consistent error types across providers

pub mod credentials;
pub mod drive;
pub mod memory;
pub mod provider;

pub use credentials::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use drive::{
    AuthConfig, AuthManager, ConsentGate, CredentialManager, CredentialOutcome, DriveStore,
};
pub use memory::MemoryStore;
pub use provider::{ObjectStore, RemoteObject};
