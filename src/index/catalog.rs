//! Track catalog
//!
//! The catalog maps short random track IDs to library-relative paths and
//! their merged tags. It is built once at startup, persisted as a single
//! JSON snapshot, and never modified while the server is running.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, RiverError};

use super::probe::Prober;
use super::walker::LibraryWalker;

/// Eight lowercase ASCII letters
pub type TrackId = String;

const TRACK_ID_LEN: usize = 8;
const TRACK_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// One playable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Path relative to the library root
    pub path: String,
    pub tags: HashMap<String, String>,
}

/// All tracks found under one library root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub songs: HashMap<TrackId, Track>,
    pub library: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
}

impl Catalog {
    pub fn new<P: Into<PathBuf>>(library: P) -> Self {
        Self {
            songs: HashMap::new(),
            library: library.into(),
            built_at: None,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.songs.get(id)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Absolute path of a track's source file
    pub fn source_path(&self, track: &Track) -> PathBuf {
        self.library.join(&track.path)
    }

    /// Insert a track under a fresh ID that is not yet in use
    pub fn insert(&mut self, ids: &mut IdGenerator, track: Track) -> TrackId {
        let id = ids.fresh_id(|candidate| self.songs.contains_key(candidate));
        self.songs.insert(id.clone(), track);
        id
    }

    /// Load a snapshot
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let catalog = serde_json::from_reader(BufReader::new(file))?;
        Ok(catalog)
    }

    /// Write a full snapshot, replacing whatever was there before.
    ///
    /// The snapshot goes to a sibling temp file first and is then renamed
    /// over the target, so readers never see a half-written file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut tmp: OsString = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let written = self
            .write_to(&tmp)
            .and_then(|()| std::fs::rename(&tmp, path).map_err(RiverError::from));
        if written.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        written
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Source of track IDs.
///
/// Holds a single RNG seeded once; it is passed explicitly to whoever
/// inserts tracks.
pub struct IdGenerator {
    rng: StdRng,
}

impl IdGenerator {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw one random ID
    pub fn next_id(&mut self) -> TrackId {
        (0..TRACK_ID_LEN)
            .map(|_| {
                let i = self.rng.gen_range(0..TRACK_ID_ALPHABET.len());
                TRACK_ID_ALPHABET[i] as char
            })
            .collect()
    }

    /// Draw IDs until one is not taken
    pub fn fresh_id<F: Fn(&str) -> bool>(&mut self, taken: F) -> TrackId {
        loop {
            let id = self.next_id();
            if !taken(&id) {
                return id;
            }
            tracing::debug!("Track ID collision on {}, drawing again", id);
        }
    }
}

/// Counters reported after a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files_seen: usize,
    pub tracks_added: usize,
    pub files_skipped: usize,
}

/// Where the catalog handed out by [`open_or_build`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Snapshot,
    Scanned(ScanSummary),
}

/// Build a catalog from a sequence of library-relative file paths.
///
/// Files the prober rejects are skipped. The first error from `files`
/// aborts the whole build.
pub fn build_catalog<I, E, P>(
    library: &Path,
    files: I,
    prober: &P,
    ids: &mut IdGenerator,
) -> Result<(Catalog, ScanSummary)>
where
    I: IntoIterator<Item = std::result::Result<PathBuf, E>>,
    E: Into<RiverError>,
    P: Prober + ?Sized,
{
    let mut catalog = Catalog::new(library);
    let mut summary = ScanSummary::default();

    for file in files {
        let relative = file.map_err(Into::<RiverError>::into)?;
        summary.files_seen += 1;

        match prober.probe(&relative) {
            Ok(track) => {
                let id = catalog.insert(ids, track);
                tracing::debug!("Added {:?} as {}", relative, id);
                summary.tracks_added += 1;
            }
            Err(e) => {
                tracing::debug!("Skipping {:?}: {}", relative, e);
                summary.files_skipped += 1;
            }
        }
    }

    catalog.built_at = Some(Utc::now());
    Ok((catalog, summary))
}

/// Scan the whole library and write a fresh snapshot
pub fn rebuild<P: Prober + ?Sized>(
    snapshot: &Path,
    library: &Path,
    prober: &P,
    ids: &mut IdGenerator,
) -> Result<(Catalog, ScanSummary)> {
    tracing::info!("Reading songs from {:?} into database", library);

    let (catalog, summary) = build_catalog(library, LibraryWalker::new(library), prober, ids)?;
    catalog.save(snapshot)?;

    tracing::info!(
        "Scan completed: {} files scanned, {} tracks added, {} skipped",
        summary.files_seen,
        summary.tracks_added,
        summary.files_skipped
    );

    Ok((catalog, summary))
}

/// Load the snapshot if it was built for `library`, otherwise rescan.
pub fn open_or_build<P: Prober + ?Sized>(
    snapshot: &Path,
    library: &Path,
    prober: &P,
    ids: &mut IdGenerator,
) -> Result<(Catalog, CatalogSource)> {
    if snapshot.exists() {
        match Catalog::load(snapshot) {
            Ok(catalog) if catalog.library == library => {
                tracing::info!(
                    "Loaded {} tracks from snapshot {:?}",
                    catalog.len(),
                    snapshot
                );
                return Ok((catalog, CatalogSource::Snapshot));
            }
            Ok(catalog) => {
                tracing::info!(
                    "Snapshot was built for {:?}, rebuilding for {:?}",
                    catalog.library,
                    library
                );
            }
            Err(e) => {
                tracing::warn!("Unable to read snapshot {:?}: {}. Rebuilding.", snapshot, e);
            }
        }
    }

    let (catalog, summary) = rebuild(snapshot, library, prober, ids)?;
    Ok((catalog, CatalogSource::Scanned(summary)))
}
