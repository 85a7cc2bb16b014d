use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("PDF not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to create scratch directory: {0}")]
    TempDir(std::io::Error),
    #[error("Failed to run {program}: {source}. Make sure poppler-utils is installed.")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("Failed to list rendered pages: {0}")]
    ReadPages(std::io::Error),
    #[error("No pages rendered from {0}")]
    NoPages(PathBuf),
    #[error("Failed to decode rendered page {page}: {source}")]
    Decode {
        page: PathBuf,
        source: image::ImageError,
    },
}

/// Turns a PDF into one image per page, in page order.
pub trait PdfRasterizer: Send + Sync {
    fn to_pages(&self, path: &Path) -> Result<Vec<DynamicImage>, RasterizeError>;
}

/// Renders pages with poppler's `pdftoppm`.
pub struct Pdftoppm {
    program: PathBuf,
    dpi: u32,
}

impl Pdftoppm {
    pub fn new(dpi: u32) -> Self {
        Self { program: PathBuf::from("pdftoppm"), dpi }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}

impl PdfRasterizer for Pdftoppm {
    fn to_pages(&self, path: &Path) -> Result<Vec<DynamicImage>, RasterizeError> {
        let _span = tracing::info_span!("rasterize.pdftoppm", path = %path.display()).entered();

        if !path.is_file() {
            return Err(RasterizeError::NotFound(path.to_path_buf()));
        }

        let scratch = tempfile::tempdir().map_err(RasterizeError::TempDir)?;
        let program = self.program.display().to_string();
        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(path)
            .arg(scratch.path().join("page"))
            .output()
            .map_err(|source| RasterizeError::Spawn { program: program.clone(), source })?;

        if !output.status.success() {
            return Err(RasterizeError::Failed {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pages = rendered_pages(scratch.path())?;
        if pages.is_empty() {
            return Err(RasterizeError::NoPages(path.to_path_buf()));
        }
        tracing::debug!(count = pages.len(), "Rendered PDF pages");

        pages
            .into_iter()
            .map(|page| image::open(&page).map_err(|source| RasterizeError::Decode { page, source }))
            .collect()
    }
}

/// `page-1.png`, `page-02.png`, … sorted by their numeric suffix.
fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>, RasterizeError> {
    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)
        .map_err(RasterizeError::ReadPages)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("png")))
        .filter_map(|p| {
            let n = p.file_stem()?.to_str()?.rsplit('-').next()?.parse().ok()?;
            Some((n, p))
        })
        .collect();
    pages.sort_by_key(|(n, _)| *n);
    Ok(pages.into_iter().map(|(_, p)| p).collect())
}

// ── Mock rasterizer (tests) ───────────────────────────────────────────────────

/// Produces `pages` blank white pages for any path.
pub struct MockRasterizer {
    pub pages: usize,
}

impl MockRasterizer {
    pub fn new(pages: usize) -> Self {
        Self { pages }
    }
}

impl PdfRasterizer for MockRasterizer {
    fn to_pages(&self, path: &Path) -> Result<Vec<DynamicImage>, RasterizeError> {
        if self.pages == 0 {
            return Err(RasterizeError::NoPages(path.to_path_buf()));
        }
        let blank: GrayImage = ImageBuffer::from_fn(8, 8, |_, _| Luma([255u8]));
        Ok(vec![DynamicImage::ImageLuma8(blank); self.pages])
    }
}
