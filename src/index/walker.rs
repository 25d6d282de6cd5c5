//! Library directory walker

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::RiverError;

/// Lazily yields the path of every file under a library root, relative to
/// that root.
///
/// Symlinked directories are never descended into. A symlink that points at
/// a regular file is yielded like any other file; dangling links and special
/// files are skipped. An unreadable directory, or a root that is not a
/// directory at all, is yielded as an error, and the caller is expected to
/// stop there.
pub struct LibraryWalker {
    root: PathBuf,
    entries: walkdir::IntoIter,
}

impl LibraryWalker {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let entries = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Self { root, entries }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

impl Iterator for LibraryWalker {
    type Item = Result<PathBuf, RiverError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };

            if entry.depth() == 0 {
                if entry.path().is_dir() {
                    continue;
                }
                return Some(Err(RiverError::NotADirectory(self.root.clone())));
            }

            let file_type = entry.file_type();
            let is_file = if file_type.is_symlink() {
                entry.path().is_file()
            } else {
                file_type.is_file()
            };

            if is_file {
                return Some(Ok(self.relative(entry.path())));
            }
        }
    }
}
