//! River music server
//!
//! Serves a personal music library over HTTPS: the library is scanned into
//! a catalog of tagged tracks at startup, and each track can be streamed
//! transcoded on the fly to Opus or MP3.

mod config;
mod config_file;
mod error;
mod ffmpeg;
mod http;
mod index;
mod state;
mod transcode;

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Cli, LogFormat, ServerConfig};
use crate::config_file::ConfigFile;
use crate::error::{Result, RiverError};
use crate::ffmpeg::Tools;
use crate::http::create_router;
use crate::index::{open_or_build, CatalogSource, FfprobeProber, IdGenerator};
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "river";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration; command line flags win over the file
    let mut config = load_config(&cli)?;
    config.apply_cli(&cli);

    init_logging(&config);
    tracing::info!("{} v{} starting", APP_NAME, VERSION);

    config.validate()?;
    config.library = std::fs::canonicalize(&config.library).map_err(|e| {
        RiverError::Config(format!("music library {:?}: {}", config.library, e))
    })?;
    tracing::debug!("Configuration loaded: {:?}", config);

    // Both tools must exist before anything is scanned or served
    let tools = Tools::locate(&config.tools)?;

    // Catalog build runs external processes one after another
    let prober = FfprobeProber::new(tools.probe.clone(), config.library.clone());
    let database = config.database.clone();
    let library = config.library.clone();
    let (catalog, source) = tokio::task::spawn_blocking(move || {
        let mut ids = IdGenerator::from_entropy();
        open_or_build(&database, &library, &prober, &mut ids)
    })
    .await
    .map_err(|e| RiverError::Io(std::io::Error::other(e)))??;

    if catalog.is_empty() {
        tracing::warn!("No playable tracks found in {:?}", config.library);
    }
    match source {
        CatalogSource::Snapshot => tracing::info!("Catalog ready: {} tracks", catalog.len()),
        CatalogSource::Scanned(summary) => tracing::info!(
            "Catalog ready: {} tracks ({} files skipped)",
            catalog.len(),
            summary.files_skipped
        ),
    }

    // Create application state
    let state = Arc::new(AppState::new(config.clone(), catalog, &tools));

    // Build router
    let app = create_router(state);

    if !config.tls_enabled() {
        tracing::warn!("No certificate configured, serving plain HTTP");
    }
    serve(&config, app).await
}

/// Read the config file; a missing file means defaults
fn load_config(cli: &Cli) -> Result<ServerConfig> {
    if cli.config.exists() {
        Ok(ConfigFile::from_file(&cli.config)?.into_server_config())
    } else {
        Ok(ServerConfig::default())
    }
}

/// Initialize logging with tracing
fn init_logging(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_directive().into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Listen with TLS when a certificate is configured, plain HTTP otherwise
async fn serve(config: &ServerConfig, app: axum::Router) -> Result<()> {
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| RiverError::Config(format!("invalid listen address: {}", e)))?;

    match (&config.cert, &config.key) {
        (Some(cert), Some(key)) => {
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
                .await
                .map_err(|e| RiverError::Tls(format!("{:?}/{:?}: {}", cert, key, e)))?;
            tracing::info!("Starting HTTPS server on {}", addr);
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            tracing::info!("Starting HTTP server on {}", addr);
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }
    }

    Ok(())
}
