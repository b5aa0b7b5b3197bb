//! Request handlers for the Clipferry HTTP surface.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use clipferry_common::{FailureKind, TransferRequest, TransferResult};

use crate::AppState;

/// Health/index route.
pub async fn index() -> &'static str {
    "Clipferry is running"
}

/// Inbound transfer payload.
#[derive(Debug, Deserialize)]
pub struct TransferBody {
    /// Remote video URL.
    pub url: String,
    /// Optional display name for the relayed object.
    #[serde(default)]
    pub name: Option<String>,
}

/// Submit a transfer and relay the structured result.
pub async fn submit_transfer(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TransferBody>,
) -> (StatusCode, Json<TransferResult>) {
    let request = TransferRequest::new(body.url, body.name);
    let result = state.engine.execute(request).await;
    (status_for(&result), Json(result))
}

/// Map a transfer result onto an HTTP status.
///
/// The body always carries the full structured result; the status is a
/// convenience for callers that only look at headers.
fn status_for(result: &TransferResult) -> StatusCode {
    match result {
        TransferResult::Success { .. } | TransferResult::AuthorizationRequired { .. } => {
            StatusCode::OK
        }
        TransferResult::Failed { kind, .. } => match kind {
            FailureKind::InvalidInput => StatusCode::BAD_REQUEST,
            FailureKind::Authorization => StatusCode::UNAUTHORIZED,
            FailureKind::Extraction | FailureKind::Upload | FailureKind::ExternalService => {
                StatusCode::BAD_GATEWAY
            }
            FailureKind::StorageIo => StatusCode::INTERNAL_SERVER_ERROR,
            FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        },
    }
}

/// Query parameters the OAuth provider sends to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Single-use authorization code.
    pub code: Option<String>,
    /// Round-trip state token.
    pub state: Option<String>,
    /// Provider error code when consent was denied.
    pub error: Option<String>,
}

/// Complete the consent round-trip and answer a neutral landing page.
///
/// Produces no payload for the original transfer caller; it only advances the
/// credential lifecycle.
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> (StatusCode, Html<String>) {
    if let Some(error) = query.error {
        tracing::warn!(%error, "Consent was denied upstream");
        return (
            StatusCode::BAD_REQUEST,
            Html(format!("Authorization failed: {}", error)),
        );
    }

    let (Some(code), Some(state_token)) = (query.code, query.state) else {
        return (
            StatusCode::BAD_REQUEST,
            Html("Missing code or state parameter".to_string()),
        );
    };

    match state
        .credentials
        .complete_authorization(&code, &state_token)
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            Html("Authorization complete. You can close this window and retry your transfer.".to_string()),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Consent completion failed");
            let status = match e.kind() {
                FailureKind::Authorization => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, Html(format!("Authorization failed: {}", e)))
        }
    }
}
