use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::money::Money;

/// One purchased line item pulled out of an OCR'd receipt or invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    /// Date the record was produced, not a date read from the document.
    pub date: NaiveDate,
    pub description: String,
    pub cost: Money,
    pub buyer_premium: Money,
    pub total_cost: Money,
    /// Manual-review flag for listing; new records are never selected.
    pub selected: bool,
}

impl ParsedItem {
    /// `None` if the premium or total does not fit in a `Decimal`.
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        cost: Money,
        premium_rate: Decimal,
    ) -> Option<Self> {
        let buyer_premium = cost.apply_rate(premium_rate)?;
        let total_cost = cost.apply_rate(Decimal::ONE.checked_add(premium_rate)?)?;
        Some(Self {
            date,
            description: description.into(),
            cost,
            buyer_premium,
            total_cost,
            selected: false,
        })
    }

    pub fn selected_flag(&self) -> &'static str {
        if self.selected { "Y" } else { "N" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate() -> Decimal {
        Decimal::new(20, 2)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn premium_and_total_at_twenty_percent() {
        let item = ParsedItem::new(day(), "Brass Lamp", Money::from_cents(1200), rate()).unwrap();
        assert_eq!(item.buyer_premium, Money::from_cents(240));
        assert_eq!(item.total_cost, Money::from_cents(1440));
        assert!(!item.selected);
        assert_eq!(item.selected_flag(), "N");
    }

    #[test]
    fn total_is_cost_plus_premium_for_every_cent_value() {
        for cents in 0..2_000 {
            let cost = Money::from_cents(cents);
            let item = ParsedItem::new(day(), "x", cost, rate()).unwrap();
            assert_eq!(item.total_cost, item.cost + item.buyer_premium, "cents = {cents}");
            assert_eq!(
                item.total_cost,
                Money::from_decimal(cost.amount() * Decimal::new(12, 1))
            );
        }
    }

    #[test]
    fn custom_rate() {
        let item = ParsedItem::new(day(), "Chair", Money::from_cents(1000), Decimal::new(15, 2)).unwrap();
        assert_eq!(item.buyer_premium, Money::from_cents(150));
        assert_eq!(item.total_cost, Money::from_cents(1150));
    }

    #[test]
    fn out_of_range_total_yields_none() {
        let cost = Money::parse_amount("70000000000000000000000000000.00").unwrap();
        assert!(ParsedItem::new(day(), "Painting", cost, rate()).is_none());
        assert!(ParsedItem::new(day(), "Chair", Money::from_cents(1000), Decimal::MAX).is_none());
    }
}
