use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rotation_curator::affinity_store::{AffinityStore, SqliteAffinityStore};
use rotation_curator::config;
use rotation_curator::curation::{CurationRequest, CurationRun, RunServices};
use rotation_curator::scraper::BrowserGate;
use rotation_curator::server::is_valid_phone;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Run one curation pass in the foreground and print its summary as JSON.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding affinity.db. Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// OAuth access token of the listener.
    #[clap(long)]
    pub access_token: String,

    /// Playlist to curate.
    #[clap(long, conflicts_with = "create_playlist")]
    pub playlist_id: Option<String>,

    /// Create a new playlist with this name and curate it.
    #[clap(long)]
    pub create_playlist: Option<String>,

    /// Catalog user id, looked up from the token when omitted.
    #[clap(long)]
    pub user_id: Option<String>,

    /// Phone number to text the summary to.
    #[clap(long)]
    pub phone: Option<String>,

    /// Listening-history account, overrides lastfm.username from the config.
    #[clap(long)]
    pub lastfm_username: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    if args.playlist_id.is_none() && args.create_playlist.is_none() {
        bail!("Either --playlist-id or --create-playlist is required");
    }
    if let Some(phone) = &args.phone {
        if !is_valid_phone(phone) {
            bail!("Invalid phone number {}, expected + followed by 11-15 digits", phone);
        }
    }

    let file_config = match &args.config {
        Some(path) => Some(config::FileConfig::load(path)?),
        None => None,
    };
    let cli_config = config::CliConfig {
        db_dir: args.db_dir.clone(),
        ..Default::default()
    };
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    let store: Arc<dyn AffinityStore> =
        Arc::new(SqliteAffinityStore::new(app_config.affinity_db_path())?);

    let mut request = CurationRequest {
        access_token: args.access_token.clone(),
        playlist_id: args.playlist_id.clone().unwrap_or_default(),
        user_id: args.user_id.clone(),
        phone: args.phone.clone(),
        lastfm_username: args
            .lastfm_username
            .clone()
            .or_else(|| app_config.lastfm.username.clone()),
    };

    let services = RunServices::from_config(&app_config, &request, store, BrowserGate::new())?;

    if let Some(name) = &args.create_playlist {
        let user_id = match &request.user_id {
            Some(user_id) => user_id.clone(),
            None => services
                .catalog
                .current_user_id()
                .await
                .context("Failed to look up the current user")?,
        };
        let playlist = services
            .catalog
            .create_playlist(&user_id, name)
            .await
            .with_context(|| format!("Failed to create playlist {}", name))?;
        info!("Created playlist {} ({})", playlist.name, playlist.id);
        request.playlist_id = playlist.id;
        request.user_id = Some(user_id);
    }

    let summary = CurationRun::new(services, app_config.curation.clone())
        .execute(&request)
        .await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
