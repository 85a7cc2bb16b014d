use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

use lotscan_core::{ParsedItem, ScanConfig};
use lotscan_ocr::{discover_inputs, FileOutcome, OcrEngine, PdfRasterizer, PipelineError, ReceiptPipeline};
use lotscan_storage::{header_matches_rate, DedupTracker, ItemTable, TableError, TrackerError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Where the item table was written and how it grew.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTable {
    pub path: PathBuf,
    pub existing_rows: usize,
    pub total_rows: usize,
}

#[derive(Debug)]
pub struct RunReport {
    /// One outcome per input file, in processing order.
    pub files: Vec<FileOutcome>,
    /// `None` when nothing was extracted and the table was left alone.
    pub saved: Option<SavedTable>,
}

impl RunReport {
    pub fn items(&self) -> impl Iterator<Item = &ParsedItem> {
        self.files.iter().flat_map(|f| f.items())
    }

    pub fn item_count(&self) -> usize {
        self.files.iter().map(|f| f.items().len()).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.files.iter().filter(|f| f.is_duplicate()).count()
    }

    /// Human-readable summary for the terminal.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        for file in &self.files {
            let path = file.path().display();
            match file {
                FileOutcome::Duplicate { .. } => writeln!(out, "Skipped {path} (already processed)")?,
                FileOutcome::Scanned(r) if r.items.is_empty() => writeln!(out, "No items found in {path}")?,
                FileOutcome::Scanned(r) => writeln!(out, "Extracted {} items from {path}", r.items.len())?,
            }
        }

        let Some(saved) = &self.saved else {
            return writeln!(out, "No items found.");
        };

        writeln!(out, "\nExtracted Items:")?;
        for item in self.items() {
            writeln!(out, "- {} : {}", item.description, item.cost)?;
        }
        writeln!(
            out,
            "\nSaved {} new rows to '{}' ({} total)",
            saved.total_rows - saved.existing_rows,
            saved.path.display(),
            saved.total_rows
        )
    }
}

/// One batch run over `config.input_dir`.
///
/// Every error aborts the run. The item table and dedup tracker are only
/// written when at least one item was extracted, table first.
pub fn run<E: OcrEngine, R: PdfRasterizer>(
    config: &ScanConfig,
    pipeline: &ReceiptPipeline<E, R>,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<RunReport, RunError> {
    let inputs = discover_inputs(&config.input_dir)?;
    tracing::info!(count = inputs.len(), dir = %config.input_dir.display(), "Found input files");

    let mut tracker = DedupTracker::load(&config.tracker);
    tracing::debug!(known = tracker.len(), "Loaded dedup tracker");

    // Hashes scanned earlier in this run; identical copies are skipped too.
    let mut seen: HashSet<String> = HashSet::new();
    let mut files = Vec::with_capacity(inputs.len());
    for path in &inputs {
        let outcome = pipeline.process_file(path, today, |h| tracker.contains(h) || seen.contains(h))?;
        if let FileOutcome::Scanned(r) = &outcome {
            seen.insert(r.hash_hex.clone());
        }
        files.push(outcome);
    }

    let mut report = RunReport { files, saved: None };
    if report.item_count() == 0 {
        tracing::info!("No items extracted; output left untouched");
        return Ok(report);
    }

    if !header_matches_rate(config.premium_rate) {
        tracing::warn!(
            rate = %config.premium_rate,
            "Premium column is labelled 20% but a different rate is configured"
        );
    }
    let mut table = ItemTable::load(&config.output)?;
    let existing_rows = table.existing_len();
    let new_items: Vec<ParsedItem> = report.items().cloned().collect();
    table.append(&new_items);
    table.save(&config.output)?;
    tracing::info!(path = %config.output.display(), rows = new_items.len(), "Item table saved");

    for file in &report.files {
        if let FileOutcome::Scanned(r) = file {
            tracker.record(r.hash_hex.clone(), &r.path, now);
        }
    }
    tracker.save(&config.tracker)?;

    report.saved = Some(SavedTable {
        path: config.output.clone(),
        existing_rows,
        total_rows: table.len(),
    });
    Ok(report)
}
