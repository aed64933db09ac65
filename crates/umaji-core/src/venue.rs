//! JRA racetrack table.
//!
//! Venue codes are the two-digit `JyoCD` values used by the master-data feed.
//! Workbooks carry either the code (sometimes without its leading zero) or
//! the track name.

use unicode_normalization::UnicodeNormalization;

use crate::errors::IdentityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Venue {
    pub code: &'static str,
    pub name: &'static str,
}

pub const VENUES: [Venue; 10] = [
    Venue { code: "01", name: "札幌" },
    Venue { code: "02", name: "函館" },
    Venue { code: "03", name: "福島" },
    Venue { code: "04", name: "新潟" },
    Venue { code: "05", name: "東京" },
    Venue { code: "06", name: "中山" },
    Venue { code: "07", name: "中京" },
    Venue { code: "08", name: "京都" },
    Venue { code: "09", name: "阪神" },
    Venue { code: "10", name: "小倉" },
];

#[must_use]
pub fn by_code(code: &str) -> Option<&'static Venue> {
    VENUES.iter().find(|v| v.code == code)
}

#[must_use]
pub fn by_name(name: &str) -> Option<&'static Venue> {
    VENUES.iter().find(|v| v.name == name)
}

/// Whether `code` is a stored-form venue code (`"01"`..`"10"`).
#[must_use]
pub fn is_known_code(code: &str) -> bool {
    by_code(code).is_some()
}

/// Resolve a workbook venue cell to its two-digit code.
///
/// Accepts `"6"`, `"06"`, `"０６"`, `"中山"`, and `"中山競馬場"`.
///
/// # Errors
///
/// Returns `IdentityError::MissingVenue` for a blank cell and
/// `IdentityError::UnknownVenue` for anything outside the table.
pub fn resolve(raw: &str) -> Result<&'static str, IdentityError> {
    let value: String = raw.nfkc().collect::<String>().trim().to_string();
    if value.is_empty() {
        return Err(IdentityError::MissingVenue);
    }

    if value.chars().all(|c| c.is_ascii_digit()) {
        let padded = format!("{:0>2}", value.trim_start_matches('0'));
        return by_code(&padded)
            .map(|v| v.code)
            .ok_or(IdentityError::UnknownVenue(value));
    }

    let name = value.trim_end_matches("競馬場");
    by_name(name)
        .map(|v| v.code)
        .ok_or(IdentityError::UnknownVenue(value))
}
