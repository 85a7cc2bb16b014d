use lotscan_core::ParsedItem;
use std::path::{Path, PathBuf};

/// Image extensions picked up from the input directory (case-insensitive).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "bmp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Pdf,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if ext == "pdf" {
            Some(InputKind::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(InputKind::Image)
        } else {
            None
        }
    }
}

/// Everything pulled out of one input file.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub path: PathBuf,
    /// SHA-256 hex digest of the file bytes; the dedup key.
    pub hash_hex: String,
    pub kind: InputKind,
    pub pages: usize,
    /// OCR text of every page, in page order.
    pub ocr_text: String,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone)]
pub enum FileOutcome {
    Scanned(ScanResult),
    /// Content hash was already known; the file was not OCR'd.
    Duplicate { path: PathBuf, hash_hex: String },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Scanned(r) => &r.path,
            FileOutcome::Duplicate { path, .. } => path,
        }
    }

    pub fn hash_hex(&self) -> &str {
        match self {
            FileOutcome::Scanned(r) => &r.hash_hex,
            FileOutcome::Duplicate { hash_hex, .. } => hash_hex,
        }
    }

    pub fn items(&self) -> &[ParsedItem] {
        match self {
            FileOutcome::Scanned(r) => &r.items,
            FileOutcome::Duplicate { .. } => &[],
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, FileOutcome::Duplicate { .. })
    }
}
