//! Library indexing module
//!
//! This module builds the track catalog from a music directory:
//! - Recursive directory walking (relative paths, no symlinked directories)
//! - Per-file metadata probing with the external inspection utility
//! - Track ID assignment and catalog snapshot persistence

pub mod catalog;
pub mod probe;
pub mod walker;

pub use catalog::{open_or_build, Catalog, CatalogSource, IdGenerator};
#[cfg(test)]
pub use catalog::{Track, TrackId};
pub use probe::FfprobeProber;
