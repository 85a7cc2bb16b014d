use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("Failed to run {program}: {source}. Make sure tesseract is installed.")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// Abstraction over an OCR engine.
/// Implementations accept PNG image bytes and return the recognized text.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError>;
}

// ── Mock engine (always available, used for tests) ────────────────────────────

/// Returns a pre-set string, so the pipeline can be exercised without
/// Tesseract installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrEngine for MockRecognizer {
    fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract command-line engine ─────────────────────────────────────────────

/// Pipes each page through the `tesseract` executable.
pub struct TesseractCli {
    program: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            language: language.into(),
        }
    }

    /// Use a specific tesseract binary instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        let _span = tracing::debug_span!("ocr.tesseract", lang = %self.language).entered();

        let program = self.program.display().to_string();
        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| OcrError::Spawn { program: program.clone(), source })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(png)
                .map_err(|e| OcrError::Engine(format!("Failed to send image to {program}: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Engine(format!("Failed to read {program} output: {e}")))?;

        if !output.status.success() {
            return Err(OcrError::Engine(format!(
                "{program} failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ── In-process Tesseract (optional, gated behind `tesseract` feature) ─────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrEngine, OcrError};
    use leptess::LepTess;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl OcrEngine for TesseractRecognizer {
        fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(png)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}
