use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Failed to serialize dedup tracker: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write dedup tracker {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub processed_at: DateTime<Utc>,
}

/// Content hash → file already turned into items. Persisted as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupTracker {
    files: BTreeMap<String, TrackedFile>,
}

impl DedupTracker {
    /// Never fails: a missing, unreadable or corrupt tracker is an empty one.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No dedup tracker yet");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring unreadable dedup tracker: {e}");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(tracker) => tracker,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring corrupt dedup tracker: {e}");
                Self::default()
            }
        }
    }

    pub fn contains(&self, hash_hex: &str) -> bool {
        self.files.contains_key(hash_hex)
    }

    pub fn get(&self, hash_hex: &str) -> Option<&TrackedFile> {
        self.files.get(hash_hex)
    }

    /// Re-recording a hash refreshes its path and timestamp.
    pub fn record(&mut self, hash_hex: impl Into<String>, path: &Path, processed_at: DateTime<Utc>) {
        self.files.insert(
            hash_hex.into(),
            TrackedFile { path: path.to_path_buf(), processed_at },
        );
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<(), TrackerError> {
        let json = serde_json::to_string_pretty(self)?;
        crate::atomic_write(path, json.as_bytes())
            .map_err(|source| TrackerError::Write { path: path.to_path_buf(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let t = DedupTracker::load(&dir.path().join("processed_files.json"));
        assert!(t.is_empty());
    }

    #[test]
    fn corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(DedupTracker::load(&path).is_empty());

        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(DedupTracker::load(&path).is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("processed_files.json");

        let mut t = DedupTracker::default();
        t.record("abc123", Path::new("input/receipt1.jpg"), at());
        t.record("def456", Path::new("input/invoice.pdf"), at());
        t.save(&path).unwrap();

        let loaded = DedupTracker::load(&path);
        assert_eq!(loaded, t);
        assert!(loaded.contains("abc123"));
        assert!(!loaded.contains("zzz"));
        assert_eq!(loaded.get("def456").unwrap().path, PathBuf::from("input/invoice.pdf"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn on_disk_shape_is_hash_keyed_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.json");
        let mut t = DedupTracker::default();
        t.record("abc123", Path::new("input/receipt1.jpg"), at());
        t.save(&path).unwrap();

        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["abc123"]["path"], "input/receipt1.jpg");
        assert_eq!(v["abc123"]["processed_at"], "2024-03-15T09:30:00Z");
    }

    #[test]
    fn record_same_hash_refreshes_entry() {
        let mut t = DedupTracker::default();
        t.record("abc", Path::new("a.jpg"), at());
        t.record("abc", Path::new("copy-of-a.jpg"), at());
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("abc").unwrap().path, PathBuf::from("copy-of-a.jpg"));
    }
}
