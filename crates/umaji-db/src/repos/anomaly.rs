//! Anomaly Detector & Quarantine.
//!
//! Detection is read-only. Quarantine is two-phase: [`MarkService::quarantine_plan`]
//! lists the malformed `source_date` values, and
//! [`MarkService::execute_quarantine`] deletes them only when confirmed and
//! only after a verified full backup. Both phases apply the same
//! [`DateDomain`] predicate.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::Local;

use umaji_core::date_domain::{DateDomain, malformed_pattern};
use umaji_core::normalize;
use umaji_core::responses::{
    AnomalousRow, AnomalyReport, DuplicateKey, MalformedDateGroup, QuarantinePlan,
    QuarantineReport, StaleNormalization,
};
use umaji_core::venue;

use crate::error::DatabaseError;
use crate::helpers::read_count;
use crate::service::MarkService;

fn row_to_anomalous(row: &libsql::Row) -> Result<AnomalousRow, DatabaseError> {
    Ok(AnomalousRow {
        source_date: row.get::<String>(0)?,
        venue_code: row.get::<String>(1)?,
        race_number: row.get::<String>(2)?,
        horse_name_normalized: row.get::<String>(3)?,
        horse_name_raw: row.get::<String>(4)?,
        source_file: row.get::<String>(5)?,
    })
}

/// Stored race numbers are `"01"`..`"12"` exactly.
fn is_canonical_race_number(value: &str) -> bool {
    normalize::race_number(value).is_ok_and(|n| n == value)
}

#[derive(Default)]
struct GroupBuilder {
    values: BTreeSet<String>,
    reasons: BTreeSet<String>,
    rows: Vec<AnomalousRow>,
}

impl MarkService {
    /// Scan the whole store for domain violations.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails.
    pub async fn detect_anomalies(&self, domain: &DateDomain) -> Result<AnomalyReport, DatabaseError> {
        let mut report = AnomalyReport::default();
        let mut groups: BTreeMap<String, GroupBuilder> = BTreeMap::new();

        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT source_date, venue_code, race_number, horse_name_normalized,
                        horse_name_raw, source_file
                 FROM horse_marks
                 ORDER BY source_date, venue_code, race_number, horse_name_normalized",
                (),
            )
            .await?;

        while let Some(row) = rows.next().await? {
            let mark = row_to_anomalous(&row)?;
            report.scanned_rows += 1;

            if let Err(violation) = domain.check(&mark.source_date) {
                let group = groups.entry(malformed_pattern(&mark.source_date)).or_default();
                group.values.insert(mark.source_date.clone());
                group.reasons.insert(violation.to_string());
                group.rows.push(mark.clone());
            }
            if !venue::is_known_code(&mark.venue_code) {
                report.venue_violations.push(mark.clone());
            }
            if !is_canonical_race_number(&mark.race_number) {
                report.race_violations.push(mark.clone());
            }
            let expected = normalize::horse_name(&mark.horse_name_raw);
            if expected != mark.horse_name_normalized {
                report.stale_normalizations.push(StaleNormalization { row: mark, expected });
            }
        }

        report.malformed_dates = groups
            .into_iter()
            .map(|(pattern, g)| MalformedDateGroup {
                pattern,
                count: u64::try_from(g.rows.len()).unwrap_or(u64::MAX),
                values: g.values.into_iter().collect(),
                reasons: g.reasons.into_iter().collect(),
                rows: g.rows,
            })
            .collect();

        report.duplicate_keys = self.duplicate_keys().await?;

        tracing::info!(
            scanned = report.scanned_rows,
            malformed = report.malformed_row_count(),
            venue = report.venue_violations.len(),
            race = report.race_violations.len(),
            duplicates = report.duplicate_keys.len(),
            stale = report.stale_normalizations.len(),
            "anomaly scan complete"
        );
        Ok(report)
    }

    async fn duplicate_keys(&self) -> Result<Vec<DuplicateKey>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT source_date, venue_code, race_number, horse_name_normalized, COUNT(*)
                 FROM horse_marks
                 GROUP BY source_date, venue_code, race_number, horse_name_normalized
                 HAVING COUNT(*) > 1",
                (),
            )
            .await?;
        let mut duplicates = Vec::new();
        while let Some(row) = rows.next().await? {
            duplicates.push(DuplicateKey {
                source_date: row.get::<String>(0)?,
                venue_code: row.get::<String>(1)?,
                race_number: row.get::<String>(2)?,
                horse_name_normalized: row.get::<String>(3)?,
                count: u64::try_from(row.get::<i64>(4)?).unwrap_or(0),
            });
        }
        Ok(duplicates)
    }

    /// Phase one: what a confirmed quarantine would delete.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the scan fails.
    pub async fn quarantine_plan(&self, domain: &DateDomain) -> Result<QuarantinePlan, DatabaseError> {
        let report = self.detect_anomalies(domain).await?;
        let malformed_values: Vec<String> = report
            .malformed_dates
            .iter()
            .flat_map(|g| g.values.iter().cloned())
            .collect();
        Ok(QuarantinePlan {
            row_count: report.malformed_row_count(),
            malformed_values,
            groups: report.malformed_dates,
        })
    }

    /// Phase two: back up the store, verify the backup, then delete.
    ///
    /// Only values in `plan` that still fail `domain` are deleted, so a plan
    /// computed under different bounds cannot remove valid rows.
    ///
    /// # Errors
    ///
    /// - `QuarantineNotConfirmed` when `confirm` is false (nothing happens).
    /// - `QuarantineBackupFailure` when the backup cannot be written or its
    ///   row count differs from the store's; nothing is deleted.
    /// - `TransactionUnavailable` when another writer holds the store.
    /// - `StoreWriteFailure` when the delete transaction fails; it is rolled
    ///   back.
    pub async fn execute_quarantine(
        &self,
        plan: &QuarantinePlan,
        confirm: bool,
        backup_dir: &Path,
        domain: &DateDomain,
    ) -> Result<QuarantineReport, DatabaseError> {
        if !confirm {
            return Err(DatabaseError::QuarantineNotConfirmed);
        }

        let rows_before = self.count_marks().await?;
        if plan.is_empty() {
            tracing::info!("quarantine plan is empty; no backup taken");
            return Ok(QuarantineReport {
                backup_path: None,
                backup_rows: 0,
                rows_before,
                rows_after: rows_before,
                deleted: 0,
                deleted_values: Vec::new(),
            });
        }

        let backup_path = self.backup_to(backup_dir).await?;
        let backup_rows = verify_backup(&backup_path, rows_before).await?;

        let targets: Vec<&String> = plan
            .malformed_values
            .iter()
            .filter(|value| {
                let still_bad = domain.is_malformed(value);
                if !still_bad {
                    tracing::warn!(value = %value, "planned value now passes the date check; kept");
                }
                still_bad
            })
            .collect();

        let deleted = self.delete_source_dates(&targets).await?;
        let rows_after = self.count_marks().await?;

        tracing::info!(
            backup = %backup_path.display(),
            rows_before,
            rows_after,
            deleted,
            "quarantine complete"
        );
        Ok(QuarantineReport {
            backup_path: Some(backup_path.display().to_string()),
            backup_rows,
            rows_before,
            rows_after,
            deleted,
            deleted_values: targets.into_iter().cloned().collect(),
        })
    }

    /// Full copy of the store via `VACUUM INTO`.
    async fn backup_to(&self, backup_dir: &Path) -> Result<PathBuf, DatabaseError> {
        std::fs::create_dir_all(backup_dir).map_err(|e| {
            DatabaseError::QuarantineBackupFailure(format!(
                "cannot create {}: {e}",
                backup_dir.display()
            ))
        })?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = backup_dir.join(format!("marks_backup_{stamp}.db"));
        if path.exists() {
            return Err(DatabaseError::QuarantineBackupFailure(format!(
                "{} already exists",
                path.display()
            )));
        }

        let target = path.display().to_string();
        self.db()
            .conn()
            .execute("VACUUM INTO ?1", [target.as_str()])
            .await
            .map_err(|e| {
                DatabaseError::QuarantineBackupFailure(format!("VACUUM INTO {target}: {e}"))
            })?;
        Ok(path)
    }

    async fn delete_source_dates(&self, values: &[&String]) -> Result<u64, DatabaseError> {
        let write_failure =
            |e: libsql::Error| DatabaseError::StoreWriteFailure(format!("quarantine delete: {e}"));
        let tx = self
            .db()
            .conn()
            .transaction_with_behavior(libsql::TransactionBehavior::Immediate)
            .await
            .map_err(|e| DatabaseError::TransactionUnavailable(format!("quarantine delete: {e}")))?;

        let mut deleted = 0;
        for value in values {
            match tx
                .execute("DELETE FROM horse_marks WHERE source_date = ?1", [value.as_str()])
                .await
            {
                Ok(n) => deleted += n,
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::error!(error = %rollback, "rollback failed");
                    }
                    return Err(write_failure(e));
                }
            }
        }
        tx.commit().await.map_err(write_failure)?;
        Ok(deleted)
    }
}

/// Open the backup and check it holds exactly `expected` rows.
async fn verify_backup(path: &Path, expected: u64) -> Result<u64, DatabaseError> {
    let failure = |reason: String| {
        DatabaseError::QuarantineBackupFailure(format!("{}: {reason}", path.display()))
    };

    let db = libsql::Builder::new_local(path)
        .build()
        .await
        .map_err(|e| failure(e.to_string()))?;
    let conn = db.connect().map_err(|e| failure(e.to_string()))?;
    let rows = conn
        .query("SELECT COUNT(*) FROM horse_marks", ())
        .await
        .map_err(|e| failure(e.to_string()))?;
    let actual = read_count(rows).await.map_err(|e| failure(e.to_string()))?;

    if actual == expected {
        Ok(actual)
    } else {
        Err(failure(format!("backup holds {actual} rows, store holds {expected}")))
    }
}
