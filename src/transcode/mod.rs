//! Audio transcoding module
//!
//! This module turns a catalog track into an encoded byte stream:
//! - The fixed table of output formats (opus, mp3)
//! - Encoder process spawning, bounded by a counting semaphore
//! - Incremental relay of the encoder's stdout, killed on drop

pub mod encoder;
pub mod format;

pub use encoder::{EncodeStream, Transcoder};
pub use format::OutputFormat;
