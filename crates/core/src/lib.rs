pub mod config;
pub mod item;
pub mod money;

pub use config::{
    ConfigError, MatchStrategy, OcrConfig, ParserConfig, ScanConfig, DEFAULT_CONFIG_FILE,
    DEFAULT_EXCLUDE_KEYWORDS, DEFAULT_PREMIUM_RATE, DEFAULT_THRESHOLD, MAX_PREMIUM_RATE,
};
pub use item::ParsedItem;
pub use money::Money;
