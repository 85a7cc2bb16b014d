use chrono::NaiveDate;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

use lotscan_core::ParsedItem;

use crate::hash;
use crate::parser::LineParser;
use crate::preprocess::{self, PreprocessError};
use crate::rasterize::{PdfRasterizer, RasterizeError};
use crate::recognizer::{OcrEngine, OcrError};
use crate::types::{FileOutcome, InputKind, ScanResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No image or PDF files found in: {0}")]
    NoInputs(PathBuf),
    #[error("Failed to read input directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Receipt file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unsupported input file: {0}")]
    Unsupported(PathBuf),
    #[error("Failed to prepare '{path}' for OCR: {source}")]
    Preprocess {
        path: PathBuf,
        source: PreprocessError,
    },
    #[error("Failed to OCR '{path}': {source}")]
    Ocr {
        path: PathBuf,
        source: OcrError,
    },
    #[error("Failed to convert PDF '{path}': {source}")]
    Rasterize {
        path: PathBuf,
        source: RasterizeError,
    },
}

/// Image and PDF files directly inside `dir`, sorted by file name.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::NoInputs(dir.to_path_buf()));
        }
        Err(source) => return Err(PipelineError::ReadDir { path: dir.to_path_buf(), source }),
    };

    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| PipelineError::ReadDir { path: dir.to_path_buf(), source })?
            .path();
        if path.is_file() && InputKind::from_path(&path).is_some() {
            inputs.push(path);
        }
    }

    if inputs.is_empty() {
        return Err(PipelineError::NoInputs(dir.to_path_buf()));
    }
    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(inputs)
}

/// Orchestrates: read → hash → dedup check → (rasterize) → threshold → OCR → parse.
pub struct ReceiptPipeline<E: OcrEngine, R: PdfRasterizer> {
    engine: E,
    rasterizer: R,
    parser: LineParser,
    threshold: u8,
}

impl<E: OcrEngine, R: PdfRasterizer> ReceiptPipeline<E, R> {
    pub fn new(engine: E, rasterizer: R, parser: LineParser, threshold: u8) -> Self {
        Self { engine, rasterizer, parser, threshold }
    }

    /// Process one input file. `is_known` is asked about the content hash
    /// before any OCR happens; known files come back as [`FileOutcome::Duplicate`].
    pub fn process_file(
        &self,
        path: &Path,
        date: NaiveDate,
        is_known: impl Fn(&str) -> bool,
    ) -> Result<FileOutcome, PipelineError> {
        let _span = tracing::info_span!("pipeline.file", path = %path.display()).entered();

        let kind = InputKind::from_path(path)
            .ok_or_else(|| PipelineError::Unsupported(path.to_path_buf()))?;

        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                PipelineError::NotFound(path.to_path_buf())
            } else {
                PipelineError::Read { path: path.to_path_buf(), source }
            }
        })?;

        let hash_hex = hash::to_hex(&hash::sha256_bytes(&bytes));
        if is_known(&hash_hex) {
            tracing::info!(hash = %hash_hex, "Already processed, skipping");
            return Ok(FileOutcome::Duplicate { path: path.to_path_buf(), hash_hex });
        }

        let pages = match kind {
            InputKind::Image => vec![preprocess::load_image(&bytes)
                .map_err(|source| PipelineError::Preprocess { path: path.to_path_buf(), source })?],
            InputKind::Pdf => self
                .rasterizer
                .to_pages(path)
                .map_err(|source| PipelineError::Rasterize { path: path.to_path_buf(), source })?,
        };

        let mut ocr_text = String::new();
        let mut items = Vec::new();
        for (index, page) in pages.iter().enumerate() {
            let (text, page_items) = self.scan_page(path, page, date)?;
            tracing::debug!(page = index + 1, items = page_items.len(), "Page scanned");
            ocr_text.push_str(&text);
            if !text.ends_with('\n') {
                ocr_text.push('\n');
            }
            items.extend(page_items);
        }

        tracing::info!(pages = pages.len(), items = items.len(), "Scanned");
        Ok(FileOutcome::Scanned(ScanResult {
            path: path.to_path_buf(),
            hash_hex,
            kind,
            pages: pages.len(),
            ocr_text,
            items,
        }))
    }

    fn scan_page(
        &self,
        path: &Path,
        page: &DynamicImage,
        date: NaiveDate,
    ) -> Result<(String, Vec<ParsedItem>), PipelineError> {
        let png = preprocess::prepare_for_ocr(page, self.threshold)
            .map_err(|source| PipelineError::Preprocess { path: path.to_path_buf(), source })?;
        let text = self
            .engine
            .recognize(&png)
            .map_err(|source| PipelineError::Ocr { path: path.to_path_buf(), source })?;
        let items = self.parser.parse(&text, date);
        Ok((text, items))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterize::MockRasterizer;
    use crate::recognizer::MockRecognizer;
    use image::{GrayImage, ImageBuffer, Luma};
    use lotscan_core::{MatchStrategy, Money, ParserConfig};
    use std::io::Cursor;

    struct BrokenEngine;

    impl OcrEngine for BrokenEngine {
        fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
            Err(OcrError::Engine("engine crashed".into()))
        }
    }

    fn tiny_png(shade: u8) -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([shade]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
    }

    fn pipeline(text: &str, pdf_pages: usize) -> ReceiptPipeline<MockRecognizer, MockRasterizer> {
        ReceiptPipeline::new(
            MockRecognizer::new(text),
            MockRasterizer::new(pdf_pages),
            LineParser::default(),
            140,
        )
    }

    fn scanned(outcome: FileOutcome) -> ScanResult {
        match outcome {
            FileOutcome::Scanned(r) => r,
            FileOutcome::Duplicate { .. } => panic!("unexpected duplicate"),
        }
    }

    #[test]
    fn discover_filters_and_sorts_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.PDF", "c.png", "notes.txt", "d.tiff"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("e.jpg")).unwrap();

        let names: Vec<String> = discover_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.PDF", "b.jpg", "c.png", "d.tiff"]);
    }

    #[test]
    fn discover_empty_or_missing_dir_is_no_inputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), b"x").unwrap();
        assert!(matches!(discover_inputs(dir.path()), Err(PipelineError::NoInputs(_))));
        assert!(matches!(
            discover_inputs(&dir.path().join("missing")),
            Err(PipelineError::NoInputs(_))
        ));
    }

    #[test]
    fn image_is_scanned_into_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, tiny_png(200)).unwrap();

        let p = pipeline("Brass Lamp   $12.00\nInvoice Total $14.40\nOak Chair 1,050.00", 1);
        let r = scanned(p.process_file(&path, day(), |_| false).unwrap());

        assert_eq!(r.hash_hex.len(), 64);
        assert_eq!(r.kind, InputKind::Image);
        assert_eq!(r.pages, 1);
        assert!(r.ocr_text.contains("Invoice Total"));
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[0].description, "Brass Lamp");
        assert_eq!(r.items[1].cost, Money::from_cents(105_000));
        assert_eq!(r.items[1].date, day());
    }

    #[test]
    fn known_hash_skips_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        let data = tiny_png(90);
        std::fs::write(&path, &data).unwrap();
        let expected = hash::to_hex(&hash::sha256_bytes(&data));

        let p = ReceiptPipeline::new(BrokenEngine, MockRasterizer::new(1), LineParser::default(), 140);
        let outcome = p.process_file(&path, day(), |h| h == expected).unwrap();
        assert!(outcome.is_duplicate());
        assert_eq!(outcome.hash_hex(), expected);
    }

    #[test]
    fn pdf_pages_are_scanned_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        std::fs::write(&path, b"%PDF-1.5 fake").unwrap();

        let p = ReceiptPipeline::new(
            MockRecognizer::new("363 Brass Lamp 1 x 12.00 12.00 T"),
            MockRasterizer::new(3),
            LineParser::new(ParserConfig { strategy: MatchStrategy::Quantity, ..ParserConfig::default() }),
            140,
        );
        let r = scanned(p.process_file(&path, day(), |_| false).unwrap());
        assert_eq!(r.kind, InputKind::Pdf);
        assert_eq!(r.pages, 3);
        assert_eq!(r.items.len(), 3);
        assert!(r.items.iter().all(|i| i.description == "Brass Lamp"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let p = pipeline("", 1);
        let err = p.process_file(Path::new("/nonexistent/receipt.jpg"), day(), |_| false).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn corrupt_image_is_preprocess_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        let err = pipeline("", 1).process_file(&path, day(), |_| false).unwrap_err();
        assert!(matches!(err, PipelineError::Preprocess { .. }));
    }

    #[test]
    fn engine_failure_is_ocr_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, tiny_png(10)).unwrap();
        let p = ReceiptPipeline::new(BrokenEngine, MockRasterizer::new(1), LineParser::default(), 140);
        let err = p.process_file(&path, day(), |_| false).unwrap_err();
        assert!(matches!(err, PipelineError::Ocr { .. }));
        assert!(err.to_string().contains("engine crashed"));
    }

    #[test]
    fn rasterizer_failure_is_rasterize_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        let err = pipeline("", 0).process_file(&path, day(), |_| false).unwrap_err();
        assert!(matches!(err, PipelineError::Rasterize { .. }));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let p = pipeline("", 1);
        let err = p.process_file(Path::new("notes.txt"), day(), |_| false).unwrap_err();
        assert!(matches!(err, PipelineError::Unsupported(_)));
    }
}
