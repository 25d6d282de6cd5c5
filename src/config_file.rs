//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::config::{LogFormat, ServerConfig, ToolsConfig};
use crate::error::{Result, RiverError};

/// Configuration file format
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Library settings
    pub library: Option<LibrarySettings>,
    /// External tool settings
    pub tools: Option<ToolsSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: Option<String>,
    /// Port to listen on
    pub port: Option<u16>,
    /// Shared basic-auth password
    pub password: String,
    /// TLS certificate (PEM)
    pub cert: Option<PathBuf>,
    /// TLS private key (PEM)
    pub key: Option<PathBuf>,
    /// Maximum concurrent encoder processes
    pub max_concurrent_transcodes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibrarySettings {
    /// Root of the music library
    pub path: Option<PathBuf>,
    /// Catalog snapshot file
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSettings {
    /// Inspection utility candidates
    pub probe: Option<Vec<String>>,
    /// Encoding utility candidates
    pub encode: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<LogFormat>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| {
            RiverError::Config(format!("unable to parse {:?}: {}", path.as_ref(), e))
        })
    }

    /// Convert to ServerConfig, falling back to defaults for unset fields
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let library = self.library.unwrap_or(LibrarySettings {
            path: None,
            database: None,
        });
        let tools = match self.tools {
            Some(t) => {
                let fallback = ToolsConfig::default();
                ToolsConfig {
                    probe: t.probe.unwrap_or(fallback.probe),
                    encode: t.encode.unwrap_or(fallback.encode),
                }
            }
            None => ToolsConfig::default(),
        };

        ServerConfig {
            host: self.server.host.unwrap_or(defaults.host),
            port: self.server.port.unwrap_or(defaults.port),
            password: self.server.password,
            cert: self.server.cert,
            key: self.server.key,
            max_concurrent_transcodes: self
                .server
                .max_concurrent_transcodes
                .unwrap_or(defaults.max_concurrent_transcodes),
            library: library.path.unwrap_or(defaults.library),
            database: library.database.unwrap_or(defaults.database),
            tools,
            log_level: self
                .logging
                .as_ref()
                .map(|l| l.level.clone())
                .unwrap_or(defaults.log_level),
            log_format: self
                .logging
                .and_then(|l| l.format)
                .unwrap_or(defaults.log_format),
        }
    }
}
