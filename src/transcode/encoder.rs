//! Encoder process management
//!
//! Every stream request gets its own encoder process writing the encoded
//! file to stdout. The output is relayed chunk by chunk as it is produced.
//! The process is owned by the returned stream: dropping the stream (for
//! example because the client went away) kills the encoder.

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::io::ReaderStream;

use crate::error::TranscodeError;

use super::format::OutputFormat;

/// Read size for the encoder's stdout
const CHUNK_SIZE: usize = 64 * 1024;

/// Encoded output. A clean end of stream means the encoder exited
/// successfully; a failed encoder ends the stream with an error item.
pub type EncodeStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Spawns encoder processes, at most `max_concurrent` at a time
#[derive(Debug, Clone)]
pub struct Transcoder {
    command: PathBuf,
    permits: Arc<Semaphore>,
}

/// State carried between chunks of one encode
struct Encoding {
    output: ReaderStream<ChildStdout>,
    child: Child,
    label: String,
    _permit: OwnedSemaphorePermit,
}

impl Transcoder {
    pub fn new(command: PathBuf, max_concurrent: usize) -> Self {
        Self {
            command,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Encoder slots currently free
    #[cfg(test)]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Start encoding `source`.
    ///
    /// Waits for a free slot when the concurrency limit is reached. Errors
    /// returned here happen before any output exists.
    pub async fn start(
        &self,
        source: &Path,
        format: OutputFormat,
    ) -> Result<EncodeStream, TranscodeError> {
        let permit = self.permits.clone().acquire_owned().await.map_err(|_| {
            TranscodeError::Spawn(std::io::Error::other("transcoder is shut down"))
        })?;

        let mut child = Command::new(&self.command)
            .args(format.encoder_args(source))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(TranscodeError::Spawn)?;

        let stdout = child.stdout.take().ok_or(TranscodeError::NoStdout)?;

        let label = format!("{} -> {}", source.display(), format.extension());
        tracing::debug!("Encoding {} (pid {:?})", label, child.id());

        Ok(relay(Encoding {
            output: ReaderStream::with_capacity(stdout, CHUNK_SIZE),
            child,
            label,
            _permit: permit,
        }))
    }
}

/// Forward stdout chunks, then check how the encoder exited.
fn relay(encoding: Encoding) -> EncodeStream {
    stream::unfold(Some(encoding), |state| async move {
        let mut encoding = state?;

        match encoding.output.next().await {
            Some(Ok(chunk)) => Some((Ok(chunk), Some(encoding))),
            Some(Err(e)) => {
                tracing::warn!("Reading encoder output for {} failed: {}", encoding.label, e);
                Some((Err(e), None))
            }
            None => match encoding.child.wait().await {
                Ok(status) if status.success() => {
                    tracing::debug!("Finished encoding {}", encoding.label);
                    None
                }
                Ok(status) => {
                    tracing::warn!("Encoder for {} exited with {}", encoding.label, status);
                    let err = std::io::Error::other(format!("encoder exited with {}", status));
                    Some((Err(err), None))
                }
                Err(e) => {
                    tracing::warn!("Waiting for encoder of {} failed: {}", encoding.label, e);
                    Some((Err(e), None))
                }
            },
        }
    })
    .boxed()
}
