//! Canonical fields, outcomes, modes, and error kinds.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CanonicalField
// ---------------------------------------------------------------------------

/// The fixed field set every workbook is mapped onto, whatever its headers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    SourceDate,
    RaceId,
    Venue,
    RaceNumber,
    HorseName,
    Umaban,
    RaceName,
    MorningOdds,
    Mark1,
    Mark2,
    Mark3,
    Mark4,
    Mark5,
    Mark6,
    Mark7,
    Mark8,
    ZiIndex,
    ZmValue,
}

impl CanonicalField {
    pub const ALL: [Self; 18] = [
        Self::SourceDate,
        Self::RaceId,
        Self::Venue,
        Self::RaceNumber,
        Self::HorseName,
        Self::Umaban,
        Self::RaceName,
        Self::MorningOdds,
        Self::Mark1,
        Self::Mark2,
        Self::Mark3,
        Self::Mark4,
        Self::Mark5,
        Self::Mark6,
        Self::Mark7,
        Self::Mark8,
        Self::ZiIndex,
        Self::ZmValue,
    ];

    pub const MARKS: [Self; 8] = [
        Self::Mark1,
        Self::Mark2,
        Self::Mark3,
        Self::Mark4,
        Self::Mark5,
        Self::Mark6,
        Self::Mark7,
        Self::Mark8,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SourceDate => "source_date",
            Self::RaceId => "race_id",
            Self::Venue => "venue",
            Self::RaceNumber => "race_number",
            Self::HorseName => "horse_name",
            Self::Umaban => "umaban",
            Self::RaceName => "race_name",
            Self::MorningOdds => "morning_odds",
            Self::Mark1 => "mark1",
            Self::Mark2 => "mark2",
            Self::Mark3 => "mark3",
            Self::Mark4 => "mark4",
            Self::Mark5 => "mark5",
            Self::Mark6 => "mark6",
            Self::Mark7 => "mark7",
            Self::Mark8 => "mark8",
            Self::ZiIndex => "zi_index",
            Self::ZmValue => "zm_value",
        }
    }

    /// Fields carrying handicapper data. A row with none of them is empty.
    #[must_use]
    pub const fn is_payload(self) -> bool {
        matches!(
            self,
            Self::MorningOdds
                | Self::Mark1
                | Self::Mark2
                | Self::Mark3
                | Self::Mark4
                | Self::Mark5
                | Self::Mark6
                | Self::Mark7
                | Self::Mark8
                | Self::ZiIndex
                | Self::ZmValue
        )
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UpsertOutcome
// ---------------------------------------------------------------------------

/// Per-row result of reconciling one normalized row against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
    /// Superseded by a later row with the same key in the same file.
    Conflicted,
}

impl UpsertOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Conflicted => "conflicted",
        }
    }
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ImportMode
// ---------------------------------------------------------------------------

/// How a multi-file import treats files whose date is already in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Reconcile every file.
    #[default]
    Full,
    /// Skip files whose date already has rows in the store.
    Incremental,
}

impl ImportMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FileStatus
// ---------------------------------------------------------------------------

/// Terminal state of one workbook within an import batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Committed,
    DryRun,
    SkippedIncremental,
    Failed,
}

impl FileStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::DryRun => "dry_run",
            Self::SkippedIncremental => "skipped_incremental",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Error taxonomy used in run summaries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnreadableWorkbook,
    UnresolvableSchema,
    UnresolvableIdentity,
    StoreWriteFailure,
    QuarantineBackupFailure,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnreadableWorkbook => "unreadable_workbook",
            Self::UnresolvableSchema => "unresolvable_schema",
            Self::UnresolvableIdentity => "unresolvable_identity",
            Self::StoreWriteFailure => "store_write_failure",
            Self::QuarantineBackupFailure => "quarantine_backup_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_field_serde_matches_as_str() {
        for field in CanonicalField::ALL {
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json, serde_json::Value::String(field.as_str().to_string()));
        }
    }

    #[test]
    fn identity_fields_are_not_payload() {
        assert!(!CanonicalField::HorseName.is_payload());
        assert!(!CanonicalField::RaceId.is_payload());
        assert!(!CanonicalField::Umaban.is_payload());
        assert!(CanonicalField::Mark5.is_payload());
        assert!(CanonicalField::ZmValue.is_payload());
    }

    #[test]
    fn import_mode_defaults_to_full() {
        assert_eq!(ImportMode::default(), ImportMode::Full);
        let parsed: ImportMode = serde_json::from_str("\"incremental\"").unwrap();
        assert_eq!(parsed, ImportMode::Incremental);
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::QuarantineBackupFailure.to_string(),
            "quarantine_backup_failure"
        );
    }
}
