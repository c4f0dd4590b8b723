//! Where snapshots come from.

use std::path::{Path, PathBuf};

use pellet_core::error::Result;
use pellet_data::reader::{load_snapshot, Snapshot};

/// Anything that can produce a fresh [`Snapshot`] on demand: the backend API,
/// a local cache file, or a fixture in tests.
pub trait SnapshotSource: Send + Sync {
    fn fetch(&self) -> Result<Snapshot>;

    /// Short description used in log lines.
    fn describe(&self) -> String;
}

/// Reads the snapshot from a JSON file on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for FileSource {
    fn fetch(&self) -> Result<Snapshot> {
        load_snapshot(&self.path)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
