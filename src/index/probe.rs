//! Track metadata probing
//!
//! Runs the inspection utility twice per file: once for the stream list and
//! once for the container ("format") section. A file is only accepted when
//! at least one stream is audio. Tags from the container come first and are
//! then overridden by each stream's tags, in stream order.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ProbeError;

use super::catalog::Track;

/// Turns one library file into a [`Track`]
pub trait Prober {
    /// Probe a file given by its path relative to the library root
    fn probe(&self, relative: &Path) -> Result<Track, ProbeError>;
}

#[derive(Debug, Deserialize)]
struct StreamsOutput {
    #[serde(default)]
    streams: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct FormatOutput {
    #[serde(default)]
    format: Map<String, Value>,
}

/// Prober backed by `ffprobe` (or a compatible `avprobe`)
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    command: PathBuf,
    library: PathBuf,
}

impl FfprobeProber {
    pub fn new(command: PathBuf, library: PathBuf) -> Self {
        Self { command, library }
    }

    /// Run the inspection utility for one section and return its stdout
    fn run(&self, section: &str, path: &Path) -> Result<Vec<u8>, ProbeError> {
        let output = Command::new(&self.command)
            .args(["-v", "quiet", "-print_format", "json", section])
            .arg(path)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| ProbeError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Exit {
                path: path.to_path_buf(),
                status: output.status,
            });
        }

        Ok(output.stdout)
    }
}

impl Prober for FfprobeProber {
    fn probe(&self, relative: &Path) -> Result<Track, ProbeError> {
        // catalog paths are JSON strings and must name the file exactly
        let name = relative
            .to_str()
            .ok_or_else(|| ProbeError::NonUtf8Path(relative.to_path_buf()))?;
        let path = self.library.join(relative);
        let malformed = |source| ProbeError::Malformed {
            path: path.clone(),
            source,
        };

        let streams: StreamsOutput =
            serde_json::from_slice(&self.run("-show_streams", &path)?).map_err(malformed)?;

        if !streams.streams.iter().any(is_audio_stream) {
            return Err(ProbeError::NotAudio(name.to_string()));
        }

        let format: FormatOutput =
            serde_json::from_slice(&self.run("-show_format", &path)?).map_err(malformed)?;

        Ok(Track {
            path: name.to_string(),
            tags: merge_tags(&format.format, &streams.streams),
        })
    }
}

fn is_audio_stream(stream: &Map<String, Value>) -> bool {
    stream.get("codec_type").and_then(Value::as_str) == Some("audio")
}

/// Merge the `tags` objects of the container and every stream.
///
/// Later writers win: the container is applied first, then streams in order.
pub fn merge_tags(
    format: &Map<String, Value>,
    streams: &[Map<String, Value>],
) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for section in std::iter::once(format).chain(streams) {
        let Some(Value::Object(section_tags)) = section.get("tags") else {
            continue;
        };
        for (key, value) in section_tags {
            if let Some(value) = tag_value(value) {
                tags.insert(key.clone(), value);
            }
        }
    }
    tags
}

/// Scalars are kept as text; null, arrays and objects are dropped.
fn tag_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
