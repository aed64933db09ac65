//! The date-domain predicate.
//!
//! One predicate decides whether a `source_date` is well-formed. Import uses it
//! to reject in-row dates, the anomaly detector uses it to find bad keys, and
//! quarantine re-checks it before deleting anything.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

const fn default_min_year() -> i32 {
    1986
}

const fn default_max_year() -> i32 {
    2099
}

/// Why a value failed the date-domain check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateViolation {
    /// Not exactly eight ASCII digits.
    NotEightDigits,
    /// Year outside the configured plausible range.
    ImplausibleYear,
    /// Month/day do not form a calendar date.
    NoSuchDay,
}

impl DateViolation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotEightDigits => "not_eight_digits",
            Self::ImplausibleYear => "implausible_year",
            Self::NoSuchDay => "no_such_day",
        }
    }
}

impl fmt::Display for DateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `YYYYMMDD` with a plausible year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateDomain {
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default = "default_max_year")]
    pub max_year: i32,
}

impl Default for DateDomain {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
        }
    }
}

impl DateDomain {
    #[must_use]
    pub const fn new(min_year: i32, max_year: i32) -> Self {
        Self { min_year, max_year }
    }

    /// Check a stored or candidate `source_date`.
    ///
    /// # Errors
    ///
    /// Returns the first [`DateViolation`] the value exhibits.
    pub fn check(&self, value: &str) -> Result<NaiveDate, DateViolation> {
        if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateViolation::NotEightDigits);
        }
        let year: i32 = value[0..4]
            .parse()
            .map_err(|_| DateViolation::NotEightDigits)?;
        if year < self.min_year || year > self.max_year {
            return Err(DateViolation::ImplausibleYear);
        }
        let month: u32 = value[4..6]
            .parse()
            .map_err(|_| DateViolation::NotEightDigits)?;
        let day: u32 = value[6..8]
            .parse()
            .map_err(|_| DateViolation::NotEightDigits)?;
        NaiveDate::from_ymd_opt(year, month, day).ok_or(DateViolation::NoSuchDay)
    }

    #[must_use]
    pub fn is_valid(&self, value: &str) -> bool {
        self.check(value).is_ok()
    }

    /// Whether a value belongs in quarantine.
    #[must_use]
    pub fn is_malformed(&self, value: &str) -> bool {
        !self.is_valid(value)
    }
}

/// Grouping pattern for a malformed value: its first five characters.
///
/// `"2502509"` and `"25025XX"` both group under `"25025"`.
#[must_use]
pub fn malformed_pattern(value: &str) -> String {
    value.chars().take(5).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("20250928")]
    #[case("19860105")]
    #[case("20240229")]
    fn accepts_plausible_dates(#[case] value: &str) {
        assert!(DateDomain::default().is_valid(value));
    }

    #[rstest]
    #[case("25025XX", DateViolation::NotEightDigits)]
    #[case("2502509", DateViolation::NotEightDigits)]
    #[case("250250928", DateViolation::NotEightDigits)]
    #[case("25025092", DateViolation::ImplausibleYear)]
    #[case("20250230", DateViolation::NoSuchDay)]
    #[case("20231301", DateViolation::NoSuchDay)]
    #[case("", DateViolation::NotEightDigits)]
    fn rejects_malformed(#[case] value: &str, #[case] violation: DateViolation) {
        assert_eq!(DateDomain::default().check(value), Err(violation));
    }

    #[test]
    fn year_bounds_are_configurable() {
        let domain = DateDomain::new(2020, 2025);
        assert!(domain.is_valid("20250101"));
        assert!(domain.is_malformed("20190101"));
        assert!(domain.is_malformed("20260101"));
    }

    #[test]
    fn pattern_takes_five_chars() {
        assert_eq!(malformed_pattern("25025XX"), "25025");
        assert_eq!(malformed_pattern("123"), "123");
    }
}
