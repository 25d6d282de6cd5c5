//! Server configuration

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, RiverError};

/// Command line flags. Anything given here overrides the config file.
#[derive(Parser, Debug, Clone)]
#[command(name = "river")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// The music library
    #[arg(short, long)]
    pub library: Option<PathBuf>,

    /// The TLS certificate to use (PEM format)
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// The TLS key to use (PEM format)
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// The port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Candidate executable names for the two external tools, searched in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Media inspection utility
    pub probe: Vec<String>,

    /// Media encoding utility
    pub encode: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            probe: vec!["ffprobe".to_string(), "avprobe".to_string()],
            encode: vec!["ffmpeg".to_string(), "avconv".to_string()],
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Shared basic-auth password
    pub password: String,

    /// TLS certificate path
    pub cert: Option<PathBuf>,

    /// TLS private key path
    pub key: Option<PathBuf>,

    /// Maximum number of encoder processes running at once
    pub max_concurrent_transcodes: usize,

    /// Root of the music library
    pub library: PathBuf,

    /// Catalog snapshot file
    pub database: PathBuf,

    /// External tool candidates
    pub tools: ToolsConfig,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 21313,
            password: String::new(),
            cert: None,
            key: None,
            max_concurrent_transcodes: 8,
            library: PathBuf::new(),
            database: PathBuf::from("db.json"),
            tools: ToolsConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// TLS is enabled when both a certificate and a key are configured
    pub fn tls_enabled(&self) -> bool {
        self.cert.is_some() && self.key.is_some()
    }

    /// Apply command line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref library) = cli.library {
            self.library = library.clone();
        }
        if let Some(ref cert) = cli.cert {
            self.cert = Some(cert.clone());
        }
        if let Some(ref key) = cli.key {
            self.key = Some(key.clone());
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.password.is_empty() {
            return Err(RiverError::Config("no password specified".to_string()));
        }
        if self.library.as_os_str().is_empty() {
            return Err(RiverError::Config("no music library specified".to_string()));
        }
        if self.cert.is_some() != self.key.is_some() {
            return Err(RiverError::Config(
                "both cert and key must be provided together".to_string(),
            ));
        }
        if self.max_concurrent_transcodes == 0 {
            return Err(RiverError::Config(
                "max_concurrent_transcodes must be at least 1".to_string(),
            ));
        }
        if self.tools.probe.is_empty() || self.tools.encode.is_empty() {
            return Err(RiverError::Config(
                "tool candidate lists must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Default `EnvFilter` directive for the configured level
    pub fn log_directive(&self) -> String {
        format!("river={},tower_http={}", self.log_level, self.log_level)
    }
}
