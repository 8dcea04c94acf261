//! Dropline CLI - connect a Dropbox account and upload files from the
//! command line.
//!
//! Uploads land in an in-memory outline, so the printed block text is
//! exactly what the page would show.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dropline_common::InsertionTarget;
use dropline_storage::{
    AuthProxy, CredentialStore, DropboxClient, DropboxConfig, FileKeyValueStore, TokenManager,
};
use dropline_upload::{MemoryDocument, UploadFile, UploadOutcome, Uploader};

#[derive(Parser)]
#[command(name = "dropline")]
#[command(about = "Dropline - Upload files to Dropbox and link them from your outline")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: <config dir>/dropline/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Credential storage file (default: <data dir>/dropline/storage.json).
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Dropbox authorization URL and open it in a browser.
    LoginUrl {
        /// Only print the URL.
        #[arg(long)]
        no_browser: bool,
    },

    /// Connect an account with the code shown after authorizing.
    Login {
        /// Authorization code.
        #[arg(short, long)]
        code: String,
    },

    /// Show the stored grant and obtain a valid access token.
    Token,

    /// Upload a file and print the resulting block.
    Upload {
        /// File to upload.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;
    let credentials = credentials_path(cli.credentials)?;

    match cli.command {
        Commands::LoginUrl { no_browser } => cmd_login_url(&config, no_browser),
        Commands::Login { code } => cmd_login(&config, &credentials, &code).await,
        Commands::Token => cmd_token(&config, &credentials).await,
        Commands::Upload { file } => cmd_upload(&config, &credentials, &file).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<DropboxConfig> {
    match path {
        Some(path) => DropboxConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => match DropboxConfig::default_path() {
            Some(path) => DropboxConfig::load_or_default(&path)
                .with_context(|| format!("Failed to load config {}", path.display())),
            None => Ok(DropboxConfig::default()),
        },
    }
}

fn credentials_path(path: Option<PathBuf>) -> Result<PathBuf> {
    path.or_else(DropboxConfig::default_credentials_path)
        .context("No data directory found; pass --credentials")
}

fn token_manager(config: &DropboxConfig, credentials: &Path) -> Result<TokenManager> {
    let proxy = AuthProxy::new(config.auth.clone(), &config.user_agent)
        .context("Failed to create auth client")?;
    let store = CredentialStore::new(Arc::new(FileKeyValueStore::new(credentials)));
    Ok(TokenManager::new(proxy, store))
}

/// Print (and open) the authorization URL.
fn cmd_login_url(config: &DropboxConfig, no_browser: bool) -> Result<()> {
    let proxy = AuthProxy::new(config.auth.clone(), &config.user_agent)?;
    let url = proxy
        .authorization_url()
        .context("Failed to build authorization URL")?;

    println!("Authorize Dropline at:\n  {}", url);

    if !no_browser {
        if let Err(e) = open::that(&url) {
            println!("Could not open a browser ({}). Open the URL manually.", e);
        }
    }

    println!("\nThen run: dropline login --code <CODE>");
    Ok(())
}

/// Exchange an authorization code and store the grant.
async fn cmd_login(config: &DropboxConfig, credentials: &Path, code: &str) -> Result<()> {
    let manager = token_manager(config, credentials)?;
    let uid = manager
        .login(code.trim())
        .await
        .context("Failed to connect Dropbox account")?;

    println!("Dropbox account connected!");
    println!("  Entry: {}", uid);
    println!("  Stored in: {}", credentials.display());

    Ok(())
}

/// Show the stored grant and a masked valid token.
async fn cmd_token(config: &DropboxConfig, credentials: &Path) -> Result<()> {
    let manager = token_manager(config, credentials)?;

    if let Some(status) = manager.status().await? {
        println!("Stored grant:");
        println!("  Entry: {}", status.uid);
        match status.issued_at {
            Some(issued_at) => println!("  Issued: {}", issued_at),
            None => println!("  Issued: unknown"),
        }
        println!("  Age: {}s of {}s", status.age_secs, status.expires_in);
        if status.expired {
            println!("  Expired, refreshing...");
        }
    }

    let token = manager
        .get_access_token()
        .await
        .context("Failed to obtain access token")?;

    println!("Access token: {}", token.masked());
    Ok(())
}

/// Upload a file into an in-memory outline.
async fn cmd_upload(config: &DropboxConfig, credentials: &Path, file: &Path) -> Result<()> {
    info!("Uploading {}", file.display());

    let file = UploadFile::from_path(file).context("Invalid file")?;
    let tokens = token_manager(config, credentials)?;
    let client = DropboxClient::new(config).context("Failed to create Dropbox client")?;

    let document = Arc::new(MemoryDocument::new());
    let page = document.create_root("dropline")?;
    let uploader = Uploader::new(Arc::new(tokens), Arc::new(client), document.clone());

    let outcome = uploader
        .upload(
            file,
            InsertionTarget::NewChild {
                parent: page,
                order: None,
            },
        )
        .await;

    if let Some(block) = outcome.block() {
        println!("{}", document.text(block).unwrap_or_default());
        for child in document.children(block) {
            println!("  {}", child.text);
        }
    }

    match outcome {
        UploadOutcome::Completed { .. } => Ok(()),
        UploadOutcome::Failed { error, .. } => anyhow::bail!("Upload failed: {}", error),
    }
}
