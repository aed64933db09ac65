//! Report types returned as JSON by `umaji` commands.
//!
//! These structs define the shape of output for `umaji import`,
//! `umaji detect-anomalies`, `umaji quarantine`, `umaji check-consistency`,
//! and `umaji headers`.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::MarkDiff;
use crate::enums::{ErrorKind, FileStatus, ImportMode};
use crate::identity::FieldWarning;

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// A row excluded from its batch, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

/// Why a whole file was not committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Per-file reconciliation summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UpsertSummary {
    pub inserted: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub conflicted: u32,
    pub diffs: Vec<MarkDiff>,
}

/// Outcome of one workbook within an import batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImportFileSummary {
    pub file: String,
    pub file_date: Option<String>,
    pub status: FileStatus,
    pub header_version: Option<String>,
    pub inserted: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub conflicted: u32,
    pub skipped: u32,
    pub resolved_via_master: u32,
    pub field_warnings: Vec<FieldWarning>,
    pub skipped_rows: Vec<SkippedRow>,
    pub diffs: Vec<MarkDiff>,
    pub failure: Option<FileFailure>,
}

impl ImportFileSummary {
    #[must_use]
    pub fn new(file: impl Into<String>, file_date: Option<String>) -> Self {
        Self {
            file: file.into(),
            file_date,
            status: FileStatus::Committed,
            header_version: None,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            conflicted: 0,
            skipped: 0,
            resolved_via_master: 0,
            field_warnings: Vec::new(),
            skipped_rows: Vec::new(),
            diffs: Vec::new(),
            failure: None,
        }
    }

    /// Mark this file failed; counts already gathered are discarded since
    /// nothing was committed.
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.status = FileStatus::Failed;
        self.inserted = 0;
        self.updated = 0;
        self.unchanged = 0;
        self.conflicted = 0;
        self.diffs.clear();
        self.failure = Some(FileFailure {
            kind,
            message: message.into(),
        });
    }

    pub fn skip_row(&mut self, line: usize, reason: impl Into<String>) {
        self.skipped += 1;
        self.skipped_rows.push(SkippedRow {
            line,
            reason: reason.into(),
        });
    }

    pub fn absorb(&mut self, upsert: UpsertSummary) {
        self.inserted = upsert.inserted;
        self.updated = upsert.updated;
        self.unchanged = upsert.unchanged;
        self.conflicted = upsert.conflicted;
        self.diffs = upsert.diffs;
    }
}

/// Counts across every file of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImportTotals {
    pub files_seen: u32,
    pub files_committed: u32,
    pub files_dry_run: u32,
    pub files_skipped: u32,
    pub files_failed: u32,
    pub inserted: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub conflicted: u32,
    pub skipped_rows: u32,
    pub field_warnings: u32,
}

/// Response from `umaji import`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImportReport {
    pub mode: ImportMode,
    pub dry_run: bool,
    pub files: Vec<ImportFileSummary>,
    pub totals: ImportTotals,
    /// Failure counts keyed by error kind; row-level skips count under
    /// `unresolvable_identity`.
    pub errors_by_kind: BTreeMap<ErrorKind, u32>,
}

impl ImportReport {
    #[must_use]
    pub fn from_files(mode: ImportMode, dry_run: bool, files: Vec<ImportFileSummary>) -> Self {
        let mut totals = ImportTotals::default();
        let mut errors_by_kind = BTreeMap::new();
        for file in &files {
            totals.files_seen += 1;
            match file.status {
                FileStatus::Committed => totals.files_committed += 1,
                FileStatus::DryRun => totals.files_dry_run += 1,
                FileStatus::SkippedIncremental => totals.files_skipped += 1,
                FileStatus::Failed => totals.files_failed += 1,
            }
            totals.inserted += file.inserted;
            totals.updated += file.updated;
            totals.unchanged += file.unchanged;
            totals.conflicted += file.conflicted;
            totals.skipped_rows += file.skipped;
            totals.field_warnings += u32::try_from(file.field_warnings.len()).unwrap_or(u32::MAX);
            if let Some(failure) = &file.failure {
                *errors_by_kind.entry(failure.kind).or_insert(0) += 1;
            }
            let unresolved = file
                .skipped_rows
                .iter()
                .filter(|row| row.reason != EMPTY_ROW_REASON)
                .count();
            if unresolved > 0 {
                *errors_by_kind
                    .entry(ErrorKind::UnresolvableIdentity)
                    .or_insert(0) += u32::try_from(unresolved).unwrap_or(u32::MAX);
            }
        }
        Self {
            mode,
            dry_run,
            files,
            totals,
            errors_by_kind,
        }
    }

    /// Whether any file failed outright.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.totals.files_failed > 0
    }
}

/// Skip reason for rows that carry a name but no marks, odds, or indices.
pub const EMPTY_ROW_REASON: &str = "no mark data";

// ---------------------------------------------------------------------------
// Anomalies and quarantine
// ---------------------------------------------------------------------------

/// A stored row referenced by an anomaly report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnomalousRow {
    pub source_date: String,
    pub venue_code: String,
    pub race_number: String,
    pub horse_name_normalized: String,
    pub horse_name_raw: String,
    pub source_file: String,
}

/// Rows whose `source_date` fails the date domain, grouped by pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MalformedDateGroup {
    pub pattern: String,
    pub count: u64,
    pub values: Vec<String>,
    pub reasons: Vec<String>,
    pub rows: Vec<AnomalousRow>,
}

/// An identity key stored more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DuplicateKey {
    pub source_date: String,
    pub venue_code: String,
    pub race_number: String,
    pub horse_name_normalized: String,
    pub count: u64,
}

/// A stored normalized name that no longer matches the normalizer's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StaleNormalization {
    pub row: AnomalousRow,
    pub expected: String,
}

/// Response from `umaji detect-anomalies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnomalyReport {
    pub scanned_rows: u64,
    pub malformed_dates: Vec<MalformedDateGroup>,
    pub venue_violations: Vec<AnomalousRow>,
    pub race_violations: Vec<AnomalousRow>,
    pub duplicate_keys: Vec<DuplicateKey>,
    pub stale_normalizations: Vec<StaleNormalization>,
}

impl AnomalyReport {
    #[must_use]
    pub fn malformed_row_count(&self) -> u64 {
        self.malformed_dates.iter().map(|g| g.count).sum()
    }

    #[must_use]
    pub fn total_anomalies(&self) -> u64 {
        let len = |n: usize| u64::try_from(n).unwrap_or(u64::MAX);
        self.malformed_row_count()
            + len(self.venue_violations.len())
            + len(self.race_violations.len())
            + len(self.duplicate_keys.len())
            + len(self.stale_normalizations.len())
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.total_anomalies() == 0
    }
}

/// What a confirmed quarantine would delete. Produced by the detector and
/// handed back unchanged to confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuarantinePlan {
    pub malformed_values: Vec<String>,
    pub row_count: u64,
    pub groups: Vec<MalformedDateGroup>,
}

impl QuarantinePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.malformed_values.is_empty()
    }
}

/// Response from `umaji quarantine --confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuarantineReport {
    pub backup_path: Option<String>,
    pub backup_rows: u64,
    pub rows_before: u64,
    pub rows_after: u64,
    pub deleted: u64,
    pub deleted_values: Vec<String>,
}

/// Response from `umaji quarantine` without `--confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuarantinePreview {
    pub confirmed: bool,
    pub plan: QuarantinePlan,
    pub hint: String,
}

// ---------------------------------------------------------------------------
// Consistency
// ---------------------------------------------------------------------------

/// A master runner with no mark row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MissingMark {
    pub venue_code: String,
    pub race_number: String,
    pub horse_name_normalized: String,
    pub umaban: Option<String>,
    pub race_title: Option<String>,
}

/// A mark row with no master runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OrphanMark {
    pub venue_code: String,
    pub race_number: String,
    pub horse_name_normalized: String,
    pub horse_name_raw: String,
    /// Master names in the same race that are not themselves marked.
    pub candidates: Vec<String>,
}

/// Response from `umaji check-consistency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConsistencyReport {
    pub date: String,
    pub master_rows: u64,
    pub mark_rows: u64,
    pub races_without_marks: Vec<MissingMark>,
    pub orphan_marks: Vec<OrphanMark>,
}

impl ConsistencyReport {
    #[must_use]
    pub fn gap_count(&self) -> usize {
        self.races_without_marks.len() + self.orphan_marks.len()
    }
}

// ---------------------------------------------------------------------------
// Header survey
// ---------------------------------------------------------------------------

/// One file in `umaji headers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HeaderSurvey {
    pub file: String,
    pub headers: Vec<String>,
    pub header_version: Option<String>,
    /// Canonical field → raw header.
    pub mapped: BTreeMap<String, String>,
    pub unmapped: Vec<String>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}
