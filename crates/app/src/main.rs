use anyhow::Context;
use chrono::{Local, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use lotscan_core::{MatchStrategy, ScanConfig};
use lotscan_ocr::{LineParser, OcrEngine, Pdftoppm, ReceiptPipeline};

#[derive(Parser)]
#[command(name = "lotscan", version)]
#[command(about = "Extract line items from scanned receipts and PDF invoices into a spreadsheet")]
struct Args {
    /// Config file (defaults to ./lotscan.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for receipt images and PDF invoices
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Item table (CSV) to create or append to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dedup tracker file
    #[arg(long)]
    tracker: Option<PathBuf>,

    /// Price matching strategy: anchored, quantity or loose
    #[arg(short, long)]
    strategy: Option<MatchStrategy>,

    /// Tesseract language(s), e.g. `eng` or `eng+deu`
    #[arg(long)]
    lang: Option<String>,

    /// Resolution used when rasterizing PDF pages
    #[arg(long)]
    dpi: Option<u32>,

    /// Binarization threshold (0-255)
    #[arg(long)]
    threshold: Option<u8>,
}

impl Args {
    fn apply(self, config: &mut ScanConfig) {
        if let Some(v) = self.input {
            config.input_dir = v;
        }
        if let Some(v) = self.output {
            config.output = v;
        }
        if let Some(v) = self.tracker {
            config.tracker = v;
        }
        if let Some(v) = self.strategy {
            config.strategy = v;
        }
        if let Some(v) = self.lang {
            config.ocr.language = v;
        }
        if let Some(v) = self.dpi {
            config.ocr.dpi = v;
        }
        if let Some(v) = self.threshold {
            config.threshold = v;
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config =
        ScanConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);

    #[cfg(feature = "tesseract")]
    let engine = lotscan_ocr::recognizer::tesseract_backend::TesseractRecognizer::new(
        None,
        &config.ocr.language,
    );
    #[cfg(not(feature = "tesseract"))]
    let engine = lotscan_ocr::TesseractCli::new(config.ocr.language.clone());

    scan(&config, engine)
}

fn scan<E: OcrEngine>(config: &ScanConfig, engine: E) -> anyhow::Result<()> {
    let rasterizer = Pdftoppm::new(config.ocr.dpi);
    tracing::debug!(
        strategy = %config.strategy,
        threshold = config.threshold,
        dpi = rasterizer.dpi(),
        "Starting run"
    );
    let pipeline = ReceiptPipeline::new(
        engine,
        rasterizer,
        LineParser::new(config.parser_config()),
        config.threshold,
    );

    let report = lotscan::run(config, &pipeline, Local::now().date_naive(), Utc::now())
        .with_context(|| format!("Run over '{}' aborted", config.input_dir.display()))?;

    report
        .write_to(&mut std::io::stdout().lock())
        .context("Failed to print report")
}
