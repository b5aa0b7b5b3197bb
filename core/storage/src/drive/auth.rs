//! OAuth2 flows and the credential lifecycle for Google Drive.

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use clipferry_common::{Error, Result};

use crate::credentials::{Credential, CredentialStore};

/// OAuth2 authorization endpoint.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// OAuth2 token endpoint.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Google Drive OAuth2 scope.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Configuration for OAuth2 authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth2 client ID.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Redirect URL for the OAuth2 callback.
    pub redirect_url: String,
}

/// OAuth2 flow driver for Google Drive.
pub struct AuthManager {
    client: BasicClient,
    config: AuthConfig,
}

impl AuthManager {
    /// Create a new authentication manager.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string())
                .map_err(|e| Error::InvalidInput(format!("Invalid auth URL: {}", e)))?,
            Some(
                TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
                    .map_err(|e| Error::InvalidInput(format!("Invalid token URL: {}", e)))?,
            ),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.redirect_url.clone())
                .map_err(|e| Error::InvalidInput(format!("Invalid redirect URL: {}", e)))?,
        );

        Ok(Self { client, config })
    }

    /// Generate the authorization URL for the user to visit.
    ///
    /// Returns the URL and the state token that must round-trip through the
    /// consent callback.
    pub fn authorization_url(&self) -> (String, String) {
        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(DRIVE_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        (auth_url.to_string(), csrf_token.secret().clone())
    }

    /// Exchange an authorization code for a credential.
    ///
    /// Not retried: authorization codes are single-use, so a blind retry can
    /// consume the grant twice.
    ///
    /// # Errors
    /// - `Authentication` when the token endpoint rejects the code
    /// - `ExternalService` on transport failure
    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| token_error("Token exchange", e))?;

        let credential = to_credential(token, None);
        if !credential.has_refresh_token() {
            tracing::warn!(
                "No refresh token received; the next expiry will require a new consent round-trip"
            );
        }
        Ok(credential)
    }

    /// Obtain a fresh access token using a refresh token.
    ///
    /// # Errors
    /// - `Authentication` when the refresh token is expired or revoked
    /// - `ExternalService` on transport failure
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        let token = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| token_error("Token refresh", e))?;

        // Refresh responses may omit the refresh token; keep the current one.
        Ok(to_credential(token, Some(refresh_token.to_string())))
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

/// Map an oauth2 request error onto the common taxonomy.
fn token_error<RE: std::error::Error + 'static, T: oauth2::ErrorResponse + 'static>(
    operation: &str,
    error: RequestTokenError<RE, T>,
) -> Error {
    match error {
        RequestTokenError::ServerResponse(response) => Error::Authentication(format!(
            "{} rejected by the token endpoint: {:?}",
            operation, response
        )),
        other => Error::ExternalService(format!("{} failed: {}", operation, other)),
    }
}

/// Build a credential from a token response.
fn to_credential(token: BasicTokenResponse, fallback_refresh: Option<String>) -> Credential {
    let access_token = token.access_token().secret().clone();
    let refresh_token = token
        .refresh_token()
        .map(|t| t.secret().clone())
        .or(fallback_refresh);

    let expires_in = token
        .expires_in()
        .unwrap_or_else(|| std::time::Duration::from_secs(3600));
    let expires_at =
        Utc::now() + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::hours(1));

    let scopes = token
        .scopes()
        .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default();

    Credential {
        access_token,
        refresh_token,
        expires_at,
        scopes,
    }
}

/// The single in-flight consent round-trip.
#[derive(Debug, Clone)]
pub struct PendingConsent {
    /// State token that must round-trip through the callback.
    pub state_token: String,
    /// When the redirect was issued.
    pub created_at: DateTime<Utc>,
}

/// Single-slot guard against forged callback completions.
///
/// At most one consent round-trip is live at a time; issuing a new one
/// supersedes the old (last-writer-wins), and a token redeems exactly once.
#[derive(Default)]
pub struct ConsentGate {
    pending: Mutex<Option<PendingConsent>>,
}

impl ConsentGate {
    /// Create a gate with no pending consent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new pending consent, superseding any live one.
    pub async fn issue(&self, state_token: String) {
        let mut slot = self.pending.lock().await;
        if let Some(previous) = slot.as_ref() {
            tracing::debug!(
                issued_at = %previous.created_at,
                "Superseding pending authorization state"
            );
        }
        *slot = Some(PendingConsent {
            state_token,
            created_at: Utc::now(),
        });
    }

    /// Compare-and-invalidate the pending consent.
    ///
    /// Consumes the slot only on an exact match; a mismatch leaves a live
    /// pending consent in place so a forged callback cannot cancel a real
    /// round-trip.
    ///
    /// # Errors
    /// - No consent is pending
    /// - The supplied token does not match
    pub async fn redeem(&self, supplied: &str) -> Result<()> {
        let mut slot = self.pending.lock().await;
        match slot.as_ref() {
            Some(pending) if pending.state_token == supplied => {
                *slot = None;
                Ok(())
            }
            Some(_) => Err(Error::Authentication(
                "State token does not match the pending authorization".to_string(),
            )),
            None => Err(Error::Authentication(
                "No authorization round-trip is pending".to_string(),
            )),
        }
    }

    /// Check whether a consent round-trip is pending.
    pub async fn is_pending(&self) -> bool {
        self.pending.lock().await.is_some()
    }
}

/// Outcome of a credential acquisition.
pub enum CredentialOutcome {
    /// A credential that passed the validity check at the moment of load.
    Valid(Credential),
    /// No usable credential; the caller must drive the consent redirect.
    ConsentRequired {
        /// URL the user must visit to grant access.
        redirect_url: String,
    },
}

/// Drives the credential lifecycle against an injected store.
///
/// States: no credential -> pending authorization -> authorized -> expired ->
/// refreshing -> authorized, falling back to pending authorization when the
/// refresh token is rejected.
pub struct CredentialManager {
    auth: AuthManager,
    store: Arc<dyn CredentialStore>,
    gate: ConsentGate,
    /// Serializes read-modify-write of the stored record so two concurrent
    /// refreshes cannot race and drop a persisted token.
    slot: Mutex<()>,
}

impl CredentialManager {
    /// Create a new manager over the given flow driver and store.
    pub fn new(auth: AuthManager, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            auth,
            store,
            gate: ConsentGate::new(),
            slot: Mutex::new(()),
        }
    }

    /// Get the consent gate.
    pub fn gate(&self) -> &ConsentGate {
        &self.gate
    }

    /// Produce a usable credential or a consent redirect.
    ///
    /// A stored, valid credential is returned directly. An expired credential
    /// with a refresh token is refreshed and the result persisted. A rejected
    /// refresh token, or the absence of one, yields a fresh consent redirect.
    ///
    /// # Errors
    /// - `ExternalService` on token endpoint transport failure
    /// - Store I/O failure
    pub async fn acquire(&self) -> Result<CredentialOutcome> {
        let _slot = self.slot.lock().await;

        let stored = self.store.load().await?;

        if let Some(credential) = &stored {
            if credential.is_valid() {
                return Ok(CredentialOutcome::Valid(credential.clone()));
            }
        }

        let refresh_token = stored
            .as_ref()
            .filter(|c| c.has_refresh_token())
            .and_then(|c| c.refresh_token.clone());

        if let Some(refresh_token) = refresh_token {
            tracing::info!("Refreshing expired access token");
            match self.auth.refresh(&refresh_token).await {
                Ok(refreshed) => {
                    self.store.save(&refreshed).await?;
                    return Ok(CredentialOutcome::Valid(refreshed));
                }
                Err(Error::Authentication(reason)) => {
                    tracing::warn!(%reason, "Refresh token rejected, restarting consent flow");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(self.begin_consent().await)
    }

    /// Complete the consent round-trip carried by the OAuth callback.
    ///
    /// The state token is redeemed before any network call, so a forged or
    /// replayed callback never reaches the token endpoint.
    ///
    /// # Errors
    /// - `Authentication` on state mismatch or a rejected authorization code
    /// - `ExternalService` on token endpoint transport failure
    pub async fn complete_authorization(
        &self,
        code: &str,
        state_token: &str,
    ) -> Result<Credential> {
        self.gate.redeem(state_token).await?;

        let credential = self.auth.exchange_code(code).await?;

        let _slot = self.slot.lock().await;
        self.store.save(&credential).await?;

        tracing::info!("Authorization completed, credential persisted");
        Ok(credential)
    }

    async fn begin_consent(&self) -> CredentialOutcome {
        let (redirect_url, state_token) = self.auth.authorization_url();
        self.gate.issue(state_token).await;
        CredentialOutcome::ConsentRequired { redirect_url }
    }
}
