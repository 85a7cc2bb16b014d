use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "lotscan.toml";

/// Summary rows printed on auction invoices that must never become items.
pub const DEFAULT_EXCLUDE_KEYWORDS: &[&str] = &[
    "Total Quantity",
    "Total Extended Price",
    "20% Buyer's Premium",
    "Tax1 Default",
    "Invoice Total",
    "Remaining Invoice Balance",
];

/// 0.20
pub const DEFAULT_PREMIUM_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Largest accepted premium rate (100%).
pub const MAX_PREMIUM_RATE: Decimal = Decimal::ONE;

/// Gray level below which a pixel is treated as ink.
pub const DEFAULT_THRESHOLD: u8 = 140;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Premium rate must not be negative (got {0})")]
    NegativePremiumRate(Decimal),
    #[error("Premium rate must not exceed 1 (100%), got {0}")]
    PremiumRateTooHigh(Decimal),
}

/// How a price is located on an OCR'd line. Ordered from strictest to loosest
/// in how much of the line must fit the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// `Description   $1,200.00` with the price at end of line.
    #[default]
    Anchored,
    /// `[lot] Description <qty> x <unit> <extended> [flag]`; the extended price wins.
    Quantity,
    /// First two-decimal number anywhere after the description.
    Loose,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Anchored => write!(f, "anchored"),
            MatchStrategy::Quantity => write!(f, "quantity"),
            MatchStrategy::Loose => write!(f, "loose"),
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anchored" => Ok(MatchStrategy::Anchored),
            "quantity" => Ok(MatchStrategy::Quantity),
            "loose" => Ok(MatchStrategy::Loose),
            other => Err(format!(
                "Unknown match strategy: '{other}' (expected anchored, quantity or loose)"
            )),
        }
    }
}

/// Everything the line parser needs, passed in explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    pub strategy: MatchStrategy,
    pub exclude_keywords: Vec<String>,
    pub premium_rate: Decimal,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::default(),
            exclude_keywords: default_keywords(),
            premium_rate: DEFAULT_PREMIUM_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrConfig {
    /// Tesseract language code(s), e.g. `eng` or `eng+deu`.
    pub language: String,
    /// Rasterization resolution for PDF pages.
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { language: "eng".to_string(), dpi: 300 }
    }
}

/// Settings for one batch run, loaded from `lotscan.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub tracker: PathBuf,
    pub strategy: MatchStrategy,
    pub premium_rate: Decimal,
    pub threshold: u8,
    pub exclude_keywords: Vec<String>,
    pub ocr: OcrConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output: PathBuf::from("All_Items.csv"),
            tracker: PathBuf::from("processed_files.json"),
            strategy: MatchStrategy::default(),
            premium_rate: DEFAULT_PREMIUM_RATE,
            threshold: DEFAULT_THRESHOLD,
            exclude_keywords: default_keywords(),
            ocr: OcrConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Load from `path`, which must exist. Without a path, `lotscan.toml` in
    /// the working directory is used when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: ScanConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.premium_rate < Decimal::ZERO {
            return Err(ConfigError::NegativePremiumRate(self.premium_rate));
        }
        if self.premium_rate > MAX_PREMIUM_RATE {
            return Err(ConfigError::PremiumRateTooHigh(self.premium_rate));
        }
        Ok(())
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            strategy: self.strategy,
            exclude_keywords: self.exclude_keywords.clone(),
            premium_rate: self.premium_rate,
        }
    }
}

fn default_keywords() -> Vec<String> {
    DEFAULT_EXCLUDE_KEYWORDS.iter().map(|k| k.to_string()).collect()
}
