//! Identity Normalizer: canonical row → keyed, normalized mark fields.
//!
//! Source date precedence: in-row `SourceDate` (when it passes the date
//! domain) → race id → file name. Venue and race number come from their own
//! columns first, then the race id, then (optionally) the master feed.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::date_domain::DateDomain;
use crate::entities::{CanonicalRow, IdentityKey, MarkFields, MasterRunner};
use crate::enums::CanonicalField;
use crate::errors::IdentityError;
use crate::normalize;
use crate::venue;

/// Resolves `(venue_code, race_number)` for a horse on a date when the
/// workbook row does not say which race it belongs to.
pub trait RaceLocator {
    fn locate(&self, source_date: &str, horse_name_normalized: &str) -> Option<(String, String)>;
}

/// In-memory master runners for one or more dates.
#[derive(Debug, Clone, Default)]
pub struct MasterSnapshot {
    runners: Vec<MasterRunner>,
}

impl MasterSnapshot {
    #[must_use]
    pub const fn new(runners: Vec<MasterRunner>) -> Self {
        Self { runners }
    }

    #[must_use]
    pub fn runners(&self) -> &[MasterRunner] {
        &self.runners
    }
}

impl RaceLocator for MasterSnapshot {
    /// Resolves only when the name appears in exactly one race that day.
    fn locate(&self, source_date: &str, horse_name_normalized: &str) -> Option<(String, String)> {
        let mut hits = self.runners.iter().filter(|r| {
            r.source_date == source_date && r.horse_name_normalized == horse_name_normalized
        });
        let first = hits.next()?;
        if hits.next().is_some() {
            return None;
        }
        Some((first.venue_code.clone(), first.race_number.clone()))
    }
}

/// Per-file inputs the normalizer needs beyond the row itself.
#[derive(Debug, Clone, Default)]
pub struct FileContext {
    pub file_name: String,
    /// Date parsed from the file name, if any.
    pub file_date: Option<String>,
}

impl FileContext {
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_date: normalize::date_from_file_name(file_name),
        }
    }
}

/// A non-fatal problem with one field of an otherwise keyed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldWarning {
    pub line: usize,
    pub field: String,
    pub value: String,
    pub reason: String,
}

/// A row ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub line: usize,
    pub key: IdentityKey,
    pub fields: MarkFields,
    pub warnings: Vec<FieldWarning>,
    pub resolved_via_master: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer {
    domain: DateDomain,
}

impl IdentityNormalizer {
    #[must_use]
    pub const fn new(domain: DateDomain) -> Self {
        Self { domain }
    }

    #[must_use]
    pub const fn domain(&self) -> &DateDomain {
        &self.domain
    }

    /// Derive the identity key and normalized fields for one row.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] when venue, race number, horse name, or
    /// source date cannot be determined.
    pub fn normalize(
        &self,
        row: &CanonicalRow,
        file: &FileContext,
        locator: Option<&dyn RaceLocator>,
    ) -> Result<NormalizedRow, IdentityError> {
        let raw_name = row
            .get_raw(CanonicalField::HorseName)
            .ok_or(IdentityError::MissingHorseName)?;
        let horse_name_normalized = normalize::horse_name(raw_name);
        if horse_name_normalized.is_empty() {
            return Err(IdentityError::MissingHorseName);
        }

        let race_id = row.get(CanonicalField::RaceId).and_then(normalize::race_id);
        let source_date = self.source_date(row, race_id.as_ref(), file)?;

        // A bad explicit column is fatal only when no race id can stand in.
        let has_race_id = race_id.is_some();
        let explicit_venue = match row.get(CanonicalField::Venue).map(venue::resolve) {
            Some(Ok(code)) => Some(code.to_string()),
            Some(Err(e)) if !has_race_id => return Err(e),
            _ => None,
        };
        let explicit_race = match row.get(CanonicalField::RaceNumber).map(normalize::race_number) {
            Some(Ok(num)) => Some(num),
            Some(Err(e)) if !has_race_id => return Err(e),
            _ => None,
        };

        let mut venue_code =
            explicit_venue.or_else(|| race_id.as_ref().map(|id| id.venue_code.clone()));
        let mut race_number = explicit_race.or_else(|| {
            race_id
                .as_ref()
                .and_then(|id| normalize::race_number(&id.race_number).ok())
        });

        let mut resolved_via_master = false;
        if venue_code.is_none() || race_number.is_none() {
            if let Some(locator) = locator {
                if let Some((v, r)) = locator.locate(&source_date, &horse_name_normalized) {
                    let agrees = venue_code.as_ref().is_none_or(|code| *code == v)
                        && race_number.as_ref().is_none_or(|num| *num == r);
                    if agrees {
                        venue_code = Some(v);
                        race_number = Some(r);
                        resolved_via_master = true;
                    }
                }
            }
        }

        let venue_code = venue_code.ok_or(IdentityError::MissingVenue)?;
        if !venue::is_known_code(&venue_code) {
            return Err(IdentityError::UnknownVenue(venue_code));
        }
        let race_number = race_number.ok_or(IdentityError::MissingRaceNumber)?;

        let mut warnings = Vec::new();
        let fields = Self::fields(row, raw_name, &mut warnings);

        Ok(NormalizedRow {
            line: row.line,
            key: IdentityKey {
                source_date,
                venue_code,
                race_number,
                horse_name_normalized,
            },
            fields,
            warnings,
            resolved_via_master,
        })
    }

    fn source_date(
        &self,
        row: &CanonicalRow,
        race_id: Option<&normalize::RaceId>,
        file: &FileContext,
    ) -> Result<String, IdentityError> {
        if let Some(explicit) = row.get(CanonicalField::SourceDate) {
            let candidate = normalize::text(explicit).replace(['-', '/', '.'], "");
            if self.domain.is_valid(&candidate) {
                return Ok(candidate);
            }
        }
        if let Some(id) = race_id {
            if self.domain.is_valid(&id.date) {
                return Ok(id.date.clone());
            }
        }
        match &file.file_date {
            Some(date) if self.domain.is_valid(date) => Ok(date.clone()),
            Some(date) => Err(IdentityError::InvalidSourceDate(date.clone())),
            None => Err(IdentityError::MissingSourceDate),
        }
    }

    fn fields(row: &CanonicalRow, raw_name: &str, warnings: &mut Vec<FieldWarning>) -> MarkFields {
        let mut fields = MarkFields {
            horse_name_raw: raw_name.to_string(),
            umaban: row.get(CanonicalField::Umaban).and_then(|v| {
                let text = normalize::text(v);
                let text = text.strip_suffix(".0").unwrap_or(&text);
                normalize::optional_text(text)
            }),
            race_name: row.get(CanonicalField::RaceName).and_then(normalize::optional_text),
            morning_odds: Self::decimal_field(row, CanonicalField::MorningOdds, warnings),
            zi_index: Self::decimal_field(row, CanonicalField::ZiIndex, warnings),
            zm_value: Self::decimal_field(row, CanonicalField::ZmValue, warnings),
            ..MarkFields::default()
        };
        for field in CanonicalField::MARKS {
            let value = row.get(field).and_then(normalize::optional_text);
            if let Some(slot) = fields.mark_slot(field) {
                *slot = value;
            }
        }
        fields
    }

    fn decimal_field(
        row: &CanonicalRow,
        field: CanonicalField,
        warnings: &mut Vec<FieldWarning>,
    ) -> Option<String> {
        let raw = row.get(field)?;
        match normalize::decimal(raw) {
            Ok(value) => value,
            Err(value) => {
                warnings.push(FieldWarning {
                    line: row.line,
                    field: field.as_str().to_string(),
                    value,
                    reason: "not a decimal; stored as null".to_string(),
                });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(values: &[(CanonicalField, &str)]) -> CanonicalRow {
        let mut row = CanonicalRow::new(2);
        for (field, value) in values {
            row.set(*field, *value);
        }
        row
    }

    fn ctx() -> FileContext {
        FileContext::from_file_name("20250928.xlsx")
    }

    #[test]
    fn race_id_supplies_full_identity() {
        let row = row(&[
            (CanonicalField::HorseName, "トウシンマカオ "),
            (CanonicalField::RaceId, "2025092806040811"),
            (CanonicalField::Mark1, "◎"),
        ]);
        let out = IdentityNormalizer::default()
            .normalize(&row, &ctx(), None)
            .unwrap();
        assert_eq!(
            out.key,
            IdentityKey {
                source_date: "20250928".into(),
                venue_code: "06".into(),
                race_number: "11".into(),
                horse_name_normalized: "トウシンマカオ".into(),
            }
        );
        assert_eq!(out.fields.horse_name_raw, "トウシンマカオ ");
        assert_eq!(out.fields.mark1.as_deref(), Some("◎"));
        assert!(out.fields.mark6.is_none());
    }

    #[test]
    fn explicit_columns_and_file_date() {
        let row = row(&[
            (CanonicalField::HorseName, "ナムラクレア\u{3000}"),
            (CanonicalField::Venue, "中山"),
            (CanonicalField::RaceNumber, "11R"),
        ]);
        let out = IdentityNormalizer::default()
            .normalize(&row, &ctx(), None)
            .unwrap();
        assert_eq!(out.key.source_date, "20250928");
        assert_eq!(out.key.venue_code, "06");
        assert_eq!(out.key.race_number, "11");
        assert_eq!(out.key.horse_name_normalized, "ナムラクレア");
    }

    #[test]
    fn malformed_in_row_date_falls_back_to_file_name() {
        let row = row(&[
            (CanonicalField::SourceDate, "2502509"),
            (CanonicalField::HorseName, "ナムラクレア"),
            (CanonicalField::Venue, "6"),
            (CanonicalField::RaceNumber, "11"),
        ]);
        let out = IdentityNormalizer::default()
            .normalize(&row, &ctx(), None)
            .unwrap();
        assert_eq!(out.key.source_date, "20250928");
    }

    #[test]
    fn missing_venue_is_unresolved() {
        let row = row(&[
            (CanonicalField::HorseName, "ナムラクレア"),
            (CanonicalField::RaceNumber, "11"),
        ]);
        let err = IdentityNormalizer::default()
            .normalize(&row, &ctx(), None)
            .unwrap_err();
        assert_eq!(err, IdentityError::MissingVenue);
    }

    #[test]
    fn no_date_anywhere_is_unresolved() {
        let row = row(&[
            (CanonicalField::HorseName, "ナムラクレア"),
            (CanonicalField::Venue, "06"),
            (CanonicalField::RaceNumber, "11"),
        ]);
        let file = FileContext::from_file_name("marks.csv");
        let err = IdentityNormalizer::default()
            .normalize(&row, &file, None)
            .unwrap_err();
        assert_eq!(err, IdentityError::MissingSourceDate);
    }

    #[test]
    fn master_locator_fills_missing_race() {
        let snapshot = MasterSnapshot::new(vec![MasterRunner {
            source_date: "20250928".into(),
            venue_code: "06".into(),
            race_number: "11".into(),
            umaban: Some("3".into()),
            horse_name_raw: "トウシンマカオ".into(),
            horse_name_normalized: "トウシンマカオ".into(),
        }]);
        let row = row(&[(CanonicalField::HorseName, "ﾄｳｼﾝﾏｶｵ")]);
        let out = IdentityNormalizer::default()
            .normalize(&row, &ctx(), Some(&snapshot))
            .unwrap();
        assert!(out.resolved_via_master);
        assert_eq!(out.key.venue_code, "06");
        assert_eq!(out.key.race_number, "11");
    }

    #[test]
    fn ambiguous_master_match_does_not_resolve() {
        let runner = |race: &str| MasterRunner {
            source_date: "20250928".into(),
            venue_code: "06".into(),
            race_number: race.into(),
            umaban: None,
            horse_name_raw: "ナムラクレア".into(),
            horse_name_normalized: "ナムラクレア".into(),
        };
        let snapshot = MasterSnapshot::new(vec![runner("10"), runner("11")]);
        let row = row(&[(CanonicalField::HorseName, "ナムラクレア")]);
        let result = IdentityNormalizer::default().normalize(&row, &ctx(), Some(&snapshot));
        assert_eq!(result.unwrap_err(), IdentityError::MissingVenue);
    }

    #[test]
    fn unparsable_index_becomes_null_with_warning() {
        let row = row(&[
            (CanonicalField::HorseName, "ナムラクレア"),
            (CanonicalField::RaceId, "2025092806040811"),
            (CanonicalField::ZiIndex, "n/a"),
            (CanonicalField::ZmValue, "45.50"),
        ]);
        let out = IdentityNormalizer::default()
            .normalize(&row, &ctx(), None)
            .unwrap();
        assert!(out.fields.zi_index.is_none());
        assert_eq!(out.fields.zm_value.as_deref(), Some("45.5"));
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].field, "zi_index");
    }

    #[test]
    fn normalization_is_deterministic() {
        let row = row(&[
            (CanonicalField::HorseName, "ﾅﾑﾗｸﾚｱ(外)"),
            (CanonicalField::RaceId, "2025092806040811"),
        ]);
        let normalizer = IdentityNormalizer::default();
        let a = normalizer.normalize(&row, &ctx(), None).unwrap();
        let b = normalizer.normalize(&row, &ctx(), None).unwrap();
        assert_eq!(a, b);
    }
}
