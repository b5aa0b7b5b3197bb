//! Clipferry - relay remote videos into Google Drive.
//!
//! Accepts a video URL over HTTP, stages the media through yt-dlp, and
//! uploads it to Drive under an OAuth2 identity.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use clipferry_api::AppState;
use clipferry_storage::{
    AuthConfig, AuthManager, CredentialManager, DriveStore, FileCredentialStore,
};
use clipferry_transfer::{TempStore, TransferConfig, TransferEngine, YtDlpExtractor};

#[derive(Parser)]
#[command(name = "clipferry")]
#[command(about = "Clipferry - video relay into Google Drive")]
#[command(version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "CLIPFERRY_LISTEN", default_value = "0.0.0.0:5000")]
    listen: SocketAddr,

    /// Root directory for staged media.
    #[arg(long, env = "CLIPFERRY_STAGING_DIR", default_value = "/tmp/clipferry")]
    staging_dir: PathBuf,

    /// Destination Drive folder ID. Required; there is no default container.
    #[arg(long, env = "CLIPFERRY_DRIVE_FOLDER_ID")]
    folder_id: String,

    /// Path of the persisted credential record. Defaults under the user
    /// config directory.
    #[arg(long, env = "CLIPFERRY_CREDENTIALS_FILE")]
    credentials_file: Option<PathBuf>,

    /// Path of the yt-dlp binary.
    #[arg(long, env = "CLIPFERRY_YTDLP", default_value = "yt-dlp")]
    yt_dlp: PathBuf,

    /// OAuth2 client ID.
    #[arg(long, env = "CLIPFERRY_OAUTH_CLIENT_ID")]
    oauth_client_id: String,

    /// OAuth2 client secret.
    #[arg(long, env = "CLIPFERRY_OAUTH_CLIENT_SECRET")]
    oauth_client_secret: String,

    /// Redirect URL registered for the OAuth2 callback.
    #[arg(
        long,
        env = "CLIPFERRY_OAUTH_REDIRECT_URL",
        default_value = "http://localhost:5000/oauth/callback"
    )]
    oauth_redirect_url: String,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let credentials_file = match cli.credentials_file {
        Some(path) => path,
        None => dirs::config_dir()
            .context("Could not determine the user config directory")?
            .join("clipferry")
            .join("credentials.json"),
    };

    let auth = AuthManager::new(AuthConfig {
        client_id: cli.oauth_client_id,
        client_secret: cli.oauth_client_secret,
        redirect_url: cli.oauth_redirect_url,
    })?;
    let store = Arc::new(FileCredentialStore::new(&credentials_file));
    let credentials = Arc::new(CredentialManager::new(auth, store));

    let engine = Arc::new(TransferEngine::new(
        Arc::new(YtDlpExtractor::new(cli.yt_dlp)),
        Arc::new(DriveStore::new()?),
        credentials,
        TempStore::new(&cli.staging_dir),
        TransferConfig::new(cli.folder_id),
    ));

    let router = clipferry_api::router(Arc::new(AppState::new(engine)));

    info!(
        listen = %cli.listen,
        staging_dir = %cli.staging_dir.display(),
        credentials_file = %credentials_file.display(),
        "Starting Clipferry"
    );

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;
    axum::serve(listener, router)
        .await
        .context("Server terminated")?;

    Ok(())
}
