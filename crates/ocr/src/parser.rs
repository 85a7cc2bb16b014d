use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use lotscan_core::{MatchStrategy, Money, ParsedItem, ParserConfig};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// `Widget Foo   $1,200.00`
re!(re_anchored,
    r"^(?P<desc>.+?)\s+\$?\s*(?P<int>[0-9]{1,3}(?:,[0-9]{3})*|[0-9]{1,6})\.(?P<frac>[0-9]{2})\s*$");

// `363 Brass Lamp 1 x 12.00 12.00 T`
re!(re_quantity,
    r"^(?:[0-9]+\s+)?(?P<desc>.+?)\s+[0-9]+\s*[xX×]\s*\$?(?:[0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)\.[0-9]{2}\s+\$?(?P<amount>(?:[0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)\.[0-9]{2})(?:\s+[A-Za-z]+)?\s*$");

// `Widget $12.00 each (2 left)`
re!(re_loose,
    r"^(?P<desc>.*?[^\s$])(?:\s*\$\s*|\s+)(?P<amount>(?:[0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)\.[0-9]{2})");

/// Description and amount pulled from a single OCR line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceMatch {
    pub description: String,
    pub amount: Money,
}

impl PriceMatch {
    fn from_parts(desc: &str, amount: &str) -> Option<Self> {
        let description = desc.trim();
        if description.is_empty() {
            return None;
        }
        Some(Self {
            description: description.to_string(),
            amount: Money::parse_amount(amount)?,
        })
    }
}

/// Description followed by a price at end of line.
pub fn match_anchored(line: &str) -> Option<PriceMatch> {
    let c = re_anchored().captures(line)?;
    let amount = format!("{}.{}", c.name("int")?.as_str(), c.name("frac")?.as_str());
    PriceMatch::from_parts(c.name("desc")?.as_str(), &amount)
}

/// Multi-column invoice row; captures the extended price, not the unit price.
pub fn match_quantity(line: &str) -> Option<PriceMatch> {
    desc_and_amount(re_quantity().captures(line)?)
}

/// First two-decimal number after the description, wherever it sits.
pub fn match_loose(line: &str) -> Option<PriceMatch> {
    desc_and_amount(re_loose().captures(line)?)
}

fn desc_and_amount(c: Captures<'_>) -> Option<PriceMatch> {
    PriceMatch::from_parts(c.name("desc")?.as_str(), c.name("amount")?.as_str())
}

// ── Line parser ───────────────────────────────────────────────────────────────

/// Turns raw OCR text into [`ParsedItem`]s. Never fails: lines that are
/// blank, excluded, or carry no recognizable price are dropped.
pub struct LineParser {
    config: ParserConfig,
    /// Lower-cased, apostrophe-normalized copies of the exclusion keywords.
    excluded: Vec<String>,
}

impl LineParser {
    pub fn new(config: ParserConfig) -> Self {
        let excluded = config
            .exclude_keywords
            .iter()
            .map(|k| fold_case(k.trim()))
            .filter(|k| !k.is_empty())
            .collect();
        Self { config, excluded }
    }

    /// Parse every line of one OCR pass, stamping items with `date`. Amounts
    /// too large to price are dropped like any other unreadable line.
    pub fn parse(&self, text: &str, date: NaiveDate) -> Vec<ParsedItem> {
        text.lines()
            .filter_map(|line| self.parse_line(line))
            .filter_map(|m| {
                let amount = m.amount;
                let item = ParsedItem::new(date, m.description, amount, self.config.premium_rate);
                if item.is_none() {
                    tracing::debug!(%amount, "Amount out of range, line dropped");
                }
                item
            })
            .collect()
    }

    pub fn parse_line(&self, line: &str) -> Option<PriceMatch> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if self.is_excluded(line) {
            tracing::debug!(line, "Skipping summary line");
            return None;
        }
        let matched = match self.config.strategy {
            MatchStrategy::Anchored => match_anchored(line),
            MatchStrategy::Quantity => match_quantity(line),
            MatchStrategy::Loose => match_loose(line),
        };
        if matched.is_none() {
            tracing::debug!(line, strategy = %self.config.strategy, "No price on line");
        }
        matched
    }

    /// Case-insensitive keyword check, applied before any price matching.
    pub fn is_excluded(&self, line: &str) -> bool {
        let folded = fold_case(line);
        self.excluded.iter().any(|k| folded.contains(k.as_str()))
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

/// OCR often renders `'` as a typographic apostrophe.
fn fold_case(s: &str) -> String {
    s.to_lowercase().replace('\u{2019}', "'")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
