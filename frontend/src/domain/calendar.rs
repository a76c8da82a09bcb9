//! Fee calendar for the academic year.
//!
//! Fees are tracked per billing period: one (month, year) pair, keyed by the
//! month name followed by the year ("June2025"). The academic year starts in
//! June, and the fee grid shows thirteen consecutive periods so that the
//! following June is visible next to the current one.

use chrono::Month;
use std::fmt;

const CALENDAR_MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// One month against which a fee payment is tracked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingPeriod {
    pub month: Month,
    pub year: i32,
    /// Month name followed by year, e.g. "June2025"
    pub key: String,
}

impl BillingPeriod {
    pub fn new(month: Month, year: i32) -> Self {
        Self {
            month,
            year,
            key: period_key(month, year),
        }
    }

    pub fn month_name(&self) -> &'static str {
        self.month.name()
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month.name(), self.year)
    }
}

pub fn period_key(month: Month, year: i32) -> String {
    format!("{}{}", month.name(), year)
}

/// Builds the ordered run of billing periods starting at an anchor month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeCalendar {
    anchor_month: Month,
    anchor_year: i32,
    months: usize,
}

impl Default for FeeCalendar {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_ANCHOR_MONTH,
            Self::DEFAULT_ANCHOR_YEAR,
            Self::DEFAULT_MONTHS,
        )
    }
}

impl FeeCalendar {
    pub const DEFAULT_ANCHOR_MONTH: Month = Month::June;
    pub const DEFAULT_ANCHOR_YEAR: i32 = 2025;
    pub const DEFAULT_MONTHS: usize = 13;

    pub fn new(anchor_month: Month, anchor_year: i32, months: usize) -> Self {
        Self {
            anchor_month,
            anchor_year,
            months,
        }
    }

    /// The consecutive billing periods, wrapping into the next year after December
    pub fn periods(&self) -> Vec<BillingPeriod> {
        // 0-based position of the anchor in calendar order (June = 5)
        let offset = self.anchor_month.number_from_month() as usize - 1;

        (0..self.months)
            .map(|step| {
                let index = offset + step;
                let month = CALENDAR_MONTHS[index % 12];
                let year = self.anchor_year + (index / 12) as i32;
                BillingPeriod::new(month, year)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_calendar_sequence() {
        let keys: Vec<String> = FeeCalendar::default()
            .periods()
            .into_iter()
            .map(|period| period.key)
            .collect();

        assert_eq!(
            keys,
            vec![
                "June2025",
                "July2025",
                "August2025",
                "September2025",
                "October2025",
                "November2025",
                "December2025",
                "January2026",
                "February2026",
                "March2026",
                "April2026",
                "May2026",
                "June2026",
            ]
        );
    }

    #[test]
    fn test_first_and_last_periods_one_year_apart() {
        let periods = FeeCalendar::default().periods();
        assert_eq!(periods.len(), 13);

        let first = periods.first().unwrap();
        let last = periods.last().unwrap();
        assert_eq!(first.month, Month::June);
        assert_eq!(last.month, Month::June);
        assert_eq!(last.year - first.year, 1);
    }

    #[test]
    fn test_custom_anchor_wraps_year() {
        let periods = FeeCalendar::new(Month::November, 2024, 4).periods();
        let keys: Vec<&str> = periods.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["November2024", "December2024", "January2025", "February2025"]);
    }

    #[test]
    fn test_length_matches_requested_months() {
        assert!(FeeCalendar::new(Month::June, 2025, 0).periods().is_empty());
        assert_eq!(FeeCalendar::new(Month::January, 2025, 25).periods().len(), 25);
        assert_eq!(
            FeeCalendar::new(Month::January, 2025, 25).periods()[24].key,
            "January2027"
        );
    }

    #[test]
    fn test_period_display() {
        let period = BillingPeriod::new(Month::January, 2026);
        assert_eq!(period.key, "January2026");
        assert_eq!(period.to_string(), "January 2026");
    }
}
