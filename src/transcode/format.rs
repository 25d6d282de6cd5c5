//! Output format table

use std::ffi::OsString;
use std::path::Path;
use std::str::FromStr;

use crate::error::TranscodeError;

/// Formats a track can be streamed as, keyed by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Opus,
    Mp3,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Opus => "opus",
            OutputFormat::Mp3 => "mp3",
        }
    }

    /// Encoder codec name
    pub fn codec(self) -> &'static str {
        match self {
            OutputFormat::Opus => "opus",
            OutputFormat::Mp3 => "libmp3lame",
        }
    }

    /// Quality flag and value; both select the best quality the codec offers
    pub fn quality(self) -> (&'static str, &'static str) {
        match self {
            OutputFormat::Opus => ("-compression_level", "10"),
            OutputFormat::Mp3 => ("-q", "0"),
        }
    }

    /// Output container (`-f`)
    pub fn container(self) -> &'static str {
        match self {
            OutputFormat::Opus => "opus",
            OutputFormat::Mp3 => "mp3",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Opus => "audio/ogg",
            OutputFormat::Mp3 => "audio/mpeg",
        }
    }

    /// Encoder arguments reading `input` and writing to stdout
    pub fn encoder_args(self, input: &Path) -> Vec<OsString> {
        let (quality_flag, quality_value) = self.quality();
        let mut args: Vec<OsString> = ["-v", "quiet", "-i"].iter().map(OsString::from).collect();
        args.push(input.as_os_str().to_owned());
        args.extend(
            [
                "-c",
                self.codec(),
                quality_flag,
                quality_value,
                "-f",
                self.container(),
                "-",
            ]
            .iter()
            .map(OsString::from),
        );
        args
    }
}

impl FromStr for OutputFormat {
    type Err = TranscodeError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        match ext {
            "opus" => Ok(OutputFormat::Opus),
            "mp3" => Ok(OutputFormat::Mp3),
            other => Err(TranscodeError::UnsupportedFormat(other.to_string())),
        }
    }
}
