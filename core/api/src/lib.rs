//! HTTP surface for Clipferry.
//!
//! Two inbound operations: submit a transfer and complete the OAuth consent
//! callback. The routing layer stays thin; all sequencing lives in the
//! transfer engine.

pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use clipferry_storage::CredentialManager;
use clipferry_transfer::TransferEngine;

/// Shared state behind the router.
pub struct AppState {
    /// Transfer orchestrator.
    pub engine: Arc<TransferEngine>,
    /// Credential lifecycle manager, advanced by the consent callback.
    pub credentials: Arc<CredentialManager>,
}

impl AppState {
    /// Build state around an engine, sharing its credential manager.
    pub fn new(engine: Arc<TransferEngine>) -> Self {
        let credentials = engine.credentials();
        Self {
            engine,
            credentials,
        }
    }
}

/// Build the Clipferry router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/transfers", post(handlers::submit_transfer))
        .route("/oauth/callback", get(handlers::oauth_callback))
        .with_state(state)
}
