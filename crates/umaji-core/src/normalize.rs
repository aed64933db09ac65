//! Pure text normalization primitives.
//!
//! Every function here is deterministic: the same input always yields the same
//! output. The identity key depends on that.

use std::str::FromStr;

use rust_decimal::Decimal;
use unicode_normalization::UnicodeNormalization;

use crate::errors::IdentityError;

/// Annotations printed after a horse name that do not change which horse it is.
const NAME_SUFFIXES: [&str; 8] = ["(外)", "(地)", "(父)", "(市)", "(抽)", "(招)", "[外]", "[地]"];

/// NFKC, then trim. Full-width letters, digits, spaces, and parentheses fold to
/// their ASCII forms; half-width katakana folds to full-width.
#[must_use]
pub fn text(raw: &str) -> String {
    raw.nfkc().collect::<String>().trim().to_string()
}

/// `text`, with empty mapped to `None`.
#[must_use]
pub fn optional_text(raw: &str) -> Option<String> {
    let value = text(raw);
    if value.is_empty() { None } else { Some(value) }
}

/// Canonical join key for a horse name.
///
/// `"ナムラクレア "`, `"ナムラクレア"` and `"ナムラクレア　"` all map to
/// `"ナムラクレア"`; `"ﾅﾑﾗｸﾚｱ(外)"` maps there too.
#[must_use]
pub fn horse_name(raw: &str) -> String {
    let folded: String = raw.nfkc().collect();
    let mut name = collapse_whitespace(&folded);

    loop {
        let before = name.len();
        for suffix in NAME_SUFFIXES {
            if let Some(stripped) = name.strip_suffix(suffix) {
                name = stripped.trim_end().to_string();
            }
        }
        if name.len() == before {
            break;
        }
    }

    name
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Race number as a zero-padded two-digit string.
///
/// Accepts `"11"`, `"11R"`, `"１１Ｒ"`, `"11.0"`.
///
/// # Errors
///
/// `MissingRaceNumber` for blank input, `InvalidRaceNumber` for anything that
/// is not an integer in `1..=12`.
pub fn race_number(raw: &str) -> Result<String, IdentityError> {
    let value = text(raw);
    if value.is_empty() {
        return Err(IdentityError::MissingRaceNumber);
    }
    let digits = value.trim_end_matches(['R', 'r']).trim();
    let digits = digits.strip_suffix(".0").unwrap_or(digits);
    match digits.parse::<u8>() {
        Ok(n) if (1..=12).contains(&n) => Ok(format!("{n:02}")),
        _ => Err(IdentityError::InvalidRaceNumber(value)),
    }
}

/// A parsed 16-digit race id: `YYYYMMDD` `JJ` `KK` `NN` `RR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceId {
    pub date: String,
    pub venue_code: String,
    pub kaiji: String,
    pub nichiji: String,
    pub race_number: String,
}

/// Parse a race id cell. Returns `None` unless it is exactly 16 digits.
#[must_use]
pub fn race_id(raw: &str) -> Option<RaceId> {
    let value = text(raw);
    let value = value.strip_suffix(".0").unwrap_or(&value);
    if value.len() != 16 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(RaceId {
        date: value[0..8].to_string(),
        venue_code: value[8..10].to_string(),
        kaiji: value[10..12].to_string(),
        nichiji: value[12..14].to_string(),
        race_number: value[14..16].to_string(),
    })
}

/// Date embedded in a workbook file name.
///
/// Recognizes an eight-digit `20YYMMDD` run anywhere in the stem, and the
/// legacy `250YYMMDD…` naming where the date is `"20"` + characters 3..9.
#[must_use]
pub fn date_from_file_name(file_name: &str) -> Option<String> {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let stem = text(stem);

    let bytes = stem.as_bytes();
    if bytes.len() >= 9 && stem.starts_with("250") && bytes[..9].iter().all(u8::is_ascii_digit) {
        return Some(format!("20{}", &stem[3..9]));
    }

    let mut start = 0;
    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let run = &stem[start..end];
        if run.len() >= 8 {
            if let Some(pos) = run.find("20") {
                if run.len() - pos >= 8 {
                    return Some(run[pos..pos + 8].to_string());
                }
            }
        }
        start = end;
    }
    None
}

/// Normalized decimal text: `"12.50"` → `"12.5"`, `"１２"` → `"12"`.
///
/// Returns `Ok(None)` for blank cells.
///
/// # Errors
///
/// Returns the cleaned input when it does not parse as a decimal, so the
/// caller can record a field warning.
pub fn decimal(raw: &str) -> Result<Option<String>, String> {
    let value = text(raw).replace(',', "");
    if value.is_empty() || value == "-" || value == "---" {
        return Ok(None);
    }
    Decimal::from_str(&value)
        .or_else(|_| Decimal::from_scientific(&value))
        .map(|d| Some(d.normalize().to_string()))
        .map_err(|_| value)
}
