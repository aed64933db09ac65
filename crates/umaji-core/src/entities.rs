//! Domain entities: mark records, identity keys, canonical rows, and master
//! references.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::CanonicalField;

// ---------------------------------------------------------------------------
// IdentityKey
// ---------------------------------------------------------------------------

/// `(source_date, venue_code, race_number, horse_name_normalized)`.
///
/// Unique across the target store.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct IdentityKey {
    pub source_date: String,
    pub venue_code: String,
    pub race_number: String,
    pub horse_name_normalized: String,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.source_date, self.venue_code, self.race_number, self.horse_name_normalized
        )
    }
}

// ---------------------------------------------------------------------------
// MarkFields
// ---------------------------------------------------------------------------

/// The non-key columns compared when deciding `unchanged` versus `updated`.
///
/// Provenance (`source_file`, `imported_at`) is not compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MarkFields {
    pub horse_name_raw: String,
    pub umaban: Option<String>,
    pub race_name: Option<String>,
    pub morning_odds: Option<String>,
    pub mark1: Option<String>,
    pub mark2: Option<String>,
    pub mark3: Option<String>,
    pub mark4: Option<String>,
    pub mark5: Option<String>,
    pub mark6: Option<String>,
    pub mark7: Option<String>,
    pub mark8: Option<String>,
    pub zi_index: Option<String>,
    pub zm_value: Option<String>,
}

impl MarkFields {
    /// Column names in storage order. Matches [`MarkFields::values`].
    pub const COLUMNS: [&'static str; 14] = [
        "horse_name_raw",
        "umaban",
        "race_name",
        "morning_odds",
        "mark1",
        "mark2",
        "mark3",
        "mark4",
        "mark5",
        "mark6",
        "mark7",
        "mark8",
        "zi_index",
        "zm_value",
    ];

    /// Column values in storage order.
    #[must_use]
    pub fn values(&self) -> [Option<&str>; 14] {
        [
            Some(self.horse_name_raw.as_str()),
            self.umaban.as_deref(),
            self.race_name.as_deref(),
            self.morning_odds.as_deref(),
            self.mark1.as_deref(),
            self.mark2.as_deref(),
            self.mark3.as_deref(),
            self.mark4.as_deref(),
            self.mark5.as_deref(),
            self.mark6.as_deref(),
            self.mark7.as_deref(),
            self.mark8.as_deref(),
            self.zi_index.as_deref(),
            self.zm_value.as_deref(),
        ]
    }

    /// Rebuild from storage-order values (inverse of [`MarkFields::values`]).
    #[must_use]
    pub fn from_values(values: [Option<String>; 14]) -> Self {
        let [
            horse_name_raw,
            umaban,
            race_name,
            morning_odds,
            mark1,
            mark2,
            mark3,
            mark4,
            mark5,
            mark6,
            mark7,
            mark8,
            zi_index,
            zm_value,
        ] = values;
        Self {
            horse_name_raw: horse_name_raw.unwrap_or_default(),
            umaban,
            race_name,
            morning_odds,
            mark1,
            mark2,
            mark3,
            mark4,
            mark5,
            mark6,
            mark7,
            mark8,
            zi_index,
            zm_value,
        }
    }

    /// Mutable access to a mark slot by canonical field.
    pub fn mark_slot(&mut self, field: CanonicalField) -> Option<&mut Option<String>> {
        match field {
            CanonicalField::Mark1 => Some(&mut self.mark1),
            CanonicalField::Mark2 => Some(&mut self.mark2),
            CanonicalField::Mark3 => Some(&mut self.mark3),
            CanonicalField::Mark4 => Some(&mut self.mark4),
            CanonicalField::Mark5 => Some(&mut self.mark5),
            CanonicalField::Mark6 => Some(&mut self.mark6),
            CanonicalField::Mark7 => Some(&mut self.mark7),
            CanonicalField::Mark8 => Some(&mut self.mark8),
            _ => None,
        }
    }

    /// Field-by-field changes from `self` (stored) to `incoming`.
    #[must_use]
    pub fn diff(&self, incoming: &Self) -> Vec<FieldChange> {
        Self::COLUMNS
            .iter()
            .zip(self.values().iter().zip(incoming.values().iter()))
            .filter(|(_, (old, new))| old != new)
            .map(|(field, (old, new))| FieldChange {
                field: (*field).to_string(),
                old: old.map(String::from),
                new: new.map(String::from),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// MarkRecord
// ---------------------------------------------------------------------------

/// One handicapper annotation set for one horse in one race on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MarkRecord {
    #[serde(flatten)]
    pub key: IdentityKey,
    pub source_file: String,
    #[serde(flatten)]
    pub fields: MarkFields,
    pub imported_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Diffs
// ---------------------------------------------------------------------------

/// One changed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}→{}",
            self.field,
            self.old.as_deref().unwrap_or("null"),
            self.new.as_deref().unwrap_or("null")
        )
    }
}

/// Audit diff emitted for every `updated` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MarkDiff {
    pub key: IdentityKey,
    pub changes: Vec<FieldChange>,
}

/// One `mark_audit` row: the diff applied to a stored mark by a later file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarkAuditEntry {
    pub id: i64,
    pub key: IdentityKey,
    pub source_file: String,
    /// `{field: {old, new}}` for every changed column.
    pub diff: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl MarkDiff {
    /// The audit-table encoding of this diff.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .changes
            .iter()
            .map(|c| {
                (
                    c.field.clone(),
                    serde_json::json!({ "old": c.old, "new": c.new }),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

// ---------------------------------------------------------------------------
// CanonicalRow
// ---------------------------------------------------------------------------

/// One workbook row after column mapping: canonical field → text value.
///
/// Unmapped fields are absent, not empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRow {
    /// 1-based line in the source sheet (header is line 1).
    pub line: usize,
    pub values: BTreeMap<CanonicalField, String>,
}

impl CanonicalRow {
    #[must_use]
    pub const fn new(line: usize) -> Self {
        Self {
            line,
            values: BTreeMap::new(),
        }
    }

    /// Raw value for a field; `None` when unmapped or blank.
    #[must_use]
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.values
            .get(&field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Value exactly as printed in the workbook; `None` when unmapped or blank.
    #[must_use]
    pub fn get_raw(&self, field: CanonicalField) -> Option<&str> {
        self.values
            .get(&field)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn set(&mut self, field: CanonicalField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    /// Whether any mark, odds, or index field carries a value.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.values
            .iter()
            .any(|(field, value)| field.is_payload() && !value.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Master data
// ---------------------------------------------------------------------------

/// Race metadata from the external master-data feed (`N_RACE`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RaceReference {
    pub year: String,
    pub month_day: String,
    pub venue_code: String,
    pub race_number: String,
    pub title: Option<String>,
    pub distance: Option<String>,
    pub grade: Option<String>,
}

/// One horse's running entry from the master feed (`N_UMA_RACE`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MasterRunner {
    pub source_date: String,
    pub venue_code: String,
    pub race_number: String,
    pub umaban: Option<String>,
    pub horse_name_raw: String,
    pub horse_name_normalized: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields() -> MarkFields {
        MarkFields {
            horse_name_raw: "ナムラクレア".into(),
            mark1: Some("◎".into()),
            mark5: Some("A".into()),
            zi_index: Some("112".into()),
            ..MarkFields::default()
        }
    }

    #[test]
    fn diff_reports_only_changed_columns() {
        let stored = fields();
        let mut incoming = fields();
        incoming.mark5 = Some("B".into());

        let diff = stored.diff(&incoming);
        assert_eq!(
            diff,
            vec![FieldChange {
                field: "mark5".into(),
                old: Some("A".into()),
                new: Some("B".into()),
            }]
        );
        assert_eq!(diff[0].to_string(), "mark5: A→B");
    }

    #[test]
    fn identical_fields_have_empty_diff() {
        assert!(fields().diff(&fields()).is_empty());
    }

    #[test]
    fn values_round_trip_through_storage_order() {
        let original = fields();
        let values = original.values().map(|v| v.map(String::from));
        assert_eq!(MarkFields::from_values(values), original);
    }

    #[test]
    fn mark_record_serializes_flat() {
        let record = MarkRecord {
            key: IdentityKey {
                source_date: "20250928".into(),
                venue_code: "06".into(),
                race_number: "11".into(),
                horse_name_normalized: "ナムラクレア".into(),
            },
            source_file: "20250928.xlsx".into(),
            fields: fields(),
            imported_at: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["venue_code"], "06");
        assert_eq!(json["mark5"], "A");
        assert_eq!(json["mark6"], serde_json::Value::Null);
    }

    #[test]
    fn canonical_row_payload_detection() {
        let mut row = CanonicalRow::new(2);
        row.set(CanonicalField::HorseName, "ナムラクレア");
        row.set(CanonicalField::Mark1, "  ");
        assert!(!row.has_payload());
        row.set(CanonicalField::ZiIndex, "98");
        assert!(row.has_payload());
        assert_eq!(row.get(CanonicalField::Mark1), None);
    }
}
