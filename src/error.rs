use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Main error type for the river server
#[derive(Error, Debug)]
pub enum RiverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("could not find {} executable (tried: {})", role, candidates.join(", "))]
    ToolNotFound {
        role: &'static str,
        candidates: Vec<String>,
    },

    #[error("Library scan failed: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("Library root {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("TLS error: {0}")]
    Tls(String),
}

/// Per-file probe failures. These never abort a library scan.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to start probe for {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("probe for {path:?} exited with {status}")]
    Exit { path: PathBuf, status: ExitStatus },

    #[error("malformed probe output for {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("'{0}' does not contain an audio stream")]
    NotAudio(String),

    #[error("file name {0:?} is not valid UTF-8")]
    NonUtf8Path(PathBuf),
}

/// Failures that happen before a transcoded body starts flowing
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Track not found: {0}")]
    NotFound(String),

    #[error("Unsupported file extension: {0}")]
    UnsupportedFormat(String),

    #[error("Unable to start encoder: {0}")]
    Spawn(std::io::Error),

    #[error("Unable to pipe output from encoder")]
    NoStdout,
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RiverError>;
