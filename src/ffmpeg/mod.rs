//! External FFmpeg-family tools
//!
//! The server never links against FFmpeg. It shells out to two executables:
//! an inspection utility (`ffprobe`/`avprobe`) used while building the
//! catalog and an encoding utility (`ffmpeg`/`avconv`) used per stream
//! request. Both are located once at startup.

use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;
use crate::error::{Result, RiverError};

/// Resolved executables for both tool roles
#[derive(Debug, Clone)]
pub struct Tools {
    pub probe: PathBuf,
    pub encode: PathBuf,
}

impl Tools {
    /// Locate one executable per role. Fails if a role has no usable candidate.
    pub fn locate(config: &ToolsConfig) -> Result<Self> {
        let probe = choose_command("inspection", &config.probe)?;
        let encode = choose_command("encoding", &config.encode)?;

        tracing::info!("Using {:?} for probing, {:?} for encoding", probe, encode);

        Ok(Self { probe, encode })
    }
}

/// Return the first candidate that resolves to an executable
pub fn choose_command(role: &'static str, candidates: &[String]) -> Result<PathBuf> {
    candidates
        .iter()
        .find_map(|name| find_executable(name))
        .ok_or_else(|| RiverError::ToolNotFound {
            role,
            candidates: candidates.to_vec(),
        })
}

/// Resolve a command name the way a shell would.
///
/// Names containing a path separator are checked as-is; bare names are
/// searched for in each `PATH` entry.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
