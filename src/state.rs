//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - The track catalog (built before serving, read-only afterwards)
//! - The transcoder with its concurrency limit
//! - Server configuration

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::TranscodeError;
use crate::ffmpeg::Tools;
use crate::index::Catalog;
use crate::transcode::{EncodeStream, OutputFormat, Transcoder};

/// Application state shared across all handlers
pub struct AppState {
    /// Immutable catalog; no locking needed
    pub catalog: Arc<Catalog>,

    /// Encoder process spawner
    pub transcoder: Transcoder,

    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig, catalog: Catalog, tools: &Tools) -> Self {
        let transcoder = Transcoder::new(tools.encode.clone(), config.max_concurrent_transcodes);
        Self {
            catalog: Arc::new(catalog),
            transcoder,
            config,
        }
    }

    /// Shared basic-auth password
    pub fn password(&self) -> &str {
        &self.config.password
    }

    /// Start streaming a file name of the form `<id>.<ext>`.
    ///
    /// The track is looked up before the extension is checked, so an unknown
    /// ID is reported as not found whatever the extension. A name without an
    /// extension names no resource at all.
    pub async fn open_stream(
        &self,
        file_name: &str,
    ) -> Result<(OutputFormat, EncodeStream), TranscodeError> {
        let (id, ext) = file_name
            .rsplit_once('.')
            .ok_or_else(|| TranscodeError::NotFound(file_name.to_string()))?;

        let track = self
            .catalog
            .get(id)
            .ok_or_else(|| TranscodeError::NotFound(id.to_string()))?;
        let format: OutputFormat = ext.parse()?;

        let source = self.catalog.source_path(track);
        tracing::info!("Streaming {} ({}) as {}", id, track.path, format.extension());

        let stream = self.transcoder.start(&source, format).await?;
        Ok((format, stream))
    }
}
