use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// A fixed-point amount with exactly two fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Round half away from zero to cents.
    pub fn from_decimal(decimal: Decimal) -> Self {
        let mut d = decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        d.rescale(2);
        Money(d)
    }

    /// Parse an OCR'd amount such as `1,200.00`. Thousands separators are dropped.
    pub fn parse_amount(s: &str) -> Option<Self> {
        let clean = s.trim().replace(',', "");
        if clean.is_empty() {
            return None;
        }
        Decimal::from_str(&clean).ok().map(Self::from_decimal)
    }

    /// `self * rate`, rounded to cents. `None` when the product is out of
    /// `Decimal` range.
    pub fn apply_rate(self, rate: Decimal) -> Option<Self> {
        self.0.checked_mul(rate).map(Self::from_decimal)
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Plain `0.00` rendering, without a currency symbol.
    pub fn to_plain_string(self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}
