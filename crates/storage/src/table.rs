use csv::StringRecord;
use lotscan_core::{ParsedItem, DEFAULT_PREMIUM_RATE};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Header row of the item spreadsheet, in column order.
pub const COLUMNS: [&str; 6] = [
    "Date",
    "Item",
    "Cost",
    "Buyer Premium (20%)",
    "Total Cost",
    "Selected for Listing",
];

/// Whether `rate` is the one the `Buyer Premium (20%)` label names. The
/// header is fixed so existing tables keep loading.
pub fn header_matches_rate(rate: Decimal) -> bool {
    rate == DEFAULT_PREMIUM_RATE
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to open existing item table {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read existing item table {path}: {source}")]
    Read {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("Existing item table {path} has unexpected columns: {found:?}")]
    UnexpectedHeader { path: PathBuf, found: Vec<String> },
    #[error("Failed to encode item table: {0}")]
    Encode(String),
    #[error("Failed to write item table {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The accumulating spreadsheet of items. Existing rows are kept verbatim;
/// new rows only ever go after them.
#[derive(Debug, Default)]
pub struct ItemTable {
    rows: Vec<StringRecord>,
    existing: usize,
}

impl ItemTable {
    /// A missing or zero-byte file is a fresh table (first run).
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(TableError::Open { path: path.to_path_buf(), source }),
        };
        let is_empty = file
            .metadata()
            .map_err(|source| TableError::Open { path: path.to_path_buf(), source })?
            .len()
            == 0;
        if is_empty {
            return Ok(Self::default());
        }

        let read_err = |source| TableError::Read { path: path.to_path_buf(), source };
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers = reader.headers().map_err(read_err)?;
        if !headers.iter().eq(COLUMNS) {
            return Err(TableError::UnexpectedHeader {
                path: path.to_path_buf(),
                found: headers.iter().map(str::to_string).collect(),
            });
        }

        let rows = reader.records().collect::<Result<Vec<_>, _>>().map_err(read_err)?;
        let existing = rows.len();
        tracing::debug!(path = %path.display(), rows = existing, "Loaded item table");
        Ok(Self { rows, existing })
    }

    pub fn append(&mut self, items: &[ParsedItem]) {
        self.rows.extend(items.iter().map(item_record));
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that were on disk when the table was loaded.
    pub fn existing_len(&self) -> usize {
        self.existing
    }

    /// Rewrite the whole table.
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(COLUMNS)
            .map_err(|e| TableError::Encode(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| TableError::Encode(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| TableError::Encode(e.to_string()))?;

        crate::atomic_write(path, &bytes)
            .map_err(|source| TableError::Write { path: path.to_path_buf(), source })
    }
}

fn item_record(item: &ParsedItem) -> StringRecord {
    StringRecord::from(vec![
        item.date.format("%Y-%m-%d").to_string(),
        item.description.clone(),
        item.cost.to_plain_string(),
        item.buyer_premium.to_plain_string(),
        item.total_cost.to_plain_string(),
        item.selected_flag().to_string(),
    ])
}
