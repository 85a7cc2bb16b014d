pub mod table;
pub mod tracker;

pub use table::{header_matches_rate, ItemTable, TableError, COLUMNS};
pub use tracker::{DedupTracker, TrackedFile, TrackerError};

use std::io;
use std::path::Path;

/// Write to a sibling `.tmp` file, then rename over `path`.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(tmp_path, path)
}
