//! Mark repository: the Reconciliation/Upsert Engine plus read queries.
//!
//! Each file is reconciled inside one `BEGIN IMMEDIATE` transaction. Per row
//! the outcome is `inserted` (new key), `unchanged` (every non-provenance
//! column equal), or `updated` (anything differs; a `mark_audit` row records
//! the diff). Rows sharing a key within one file are `conflicted` except the
//! last, which is the one reconciled.

use std::collections::HashMap;

use chrono::Utc;
use libsql::TransactionBehavior;

use umaji_core::entities::{IdentityKey, MarkDiff, MarkFields, MarkRecord};
use umaji_core::enums::UpsertOutcome;
use umaji_core::identity::NormalizedRow;
use umaji_core::responses::UpsertSummary;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_optional_datetime};
use crate::service::MarkService;

const MARK_COLUMNS: &str = "source_date, venue_code, race_number, horse_name_normalized, \
     horse_name_raw, umaban, race_name, morning_odds, \
     mark1, mark2, mark3, mark4, mark5, mark6, mark7, mark8, \
     zi_index, zm_value, source_file, imported_at";

const KEY_FILTER: &str =
    "source_date = ?1 AND venue_code = ?2 AND race_number = ?3 AND horse_name_normalized = ?4";

/// Column offset of the first `MarkFields` column in `MARK_COLUMNS`.
const FIELDS_OFFSET: i32 = 4;

pub(crate) fn row_to_key(row: &libsql::Row) -> Result<IdentityKey, DatabaseError> {
    Ok(IdentityKey {
        source_date: row.get::<String>(0)?,
        venue_code: row.get::<String>(1)?,
        race_number: row.get::<String>(2)?,
        horse_name_normalized: row.get::<String>(3)?,
    })
}

fn row_to_fields(row: &libsql::Row, offset: i32) -> Result<MarkFields, DatabaseError> {
    let mut values: [Option<String>; 14] = Default::default();
    for (i, slot) in (0_i32..).zip(values.iter_mut()) {
        *slot = get_opt_string(row, offset + i)?;
    }
    Ok(MarkFields::from_values(values))
}

fn row_to_mark(row: &libsql::Row) -> Result<MarkRecord, DatabaseError> {
    let fields = row_to_fields(row, FIELDS_OFFSET)?;
    Ok(MarkRecord {
        key: row_to_key(row)?,
        fields,
        source_file: row.get::<String>(18)?,
        imported_at: parse_optional_datetime(get_opt_string(row, 19)?.as_deref())?,
    })
}

fn key_params(key: &IdentityKey) -> Vec<libsql::Value> {
    vec![
        key.source_date.as_str().into(),
        key.venue_code.as_str().into(),
        key.race_number.as_str().into(),
        key.horse_name_normalized.as_str().into(),
    ]
}

/// Collapse rows sharing an identity key: the last occurrence wins.
///
/// Returns the surviving rows in first-seen key order and the number of
/// superseded rows.
fn last_wins(source_file: &str, rows: Vec<NormalizedRow>) -> (Vec<NormalizedRow>, u32) {
    let mut order: Vec<IdentityKey> = Vec::new();
    let mut latest: HashMap<IdentityKey, NormalizedRow> = HashMap::new();
    let mut conflicted = 0;
    for row in rows {
        if let Some(previous) = latest.get(&row.key) {
            conflicted += 1;
            tracing::warn!(
                file = source_file,
                key = %row.key,
                earlier_line = previous.line,
                line = row.line,
                outcome = UpsertOutcome::Conflicted.as_str(),
                "duplicate key in file; later row wins"
            );
        } else {
            order.push(row.key.clone());
        }
        latest.insert(row.key.clone(), row);
    }
    let survivors = order
        .into_iter()
        .filter_map(|key| latest.remove(&key))
        .collect();
    (survivors, conflicted)
}

impl MarkService {
    /// Reconcile one file's normalized rows against the store.
    ///
    /// With `dry_run` the outcome is computed inside the transaction, which
    /// is then rolled back.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::TransactionUnavailable` when the write
    /// transaction cannot be started, or `DatabaseError::StoreWriteFailure`
    /// when any statement or the commit fails; the transaction is rolled back
    /// and no row from the file is kept.
    pub async fn reconcile_file(
        &self,
        source_file: &str,
        rows: Vec<NormalizedRow>,
        dry_run: bool,
    ) -> Result<UpsertSummary, DatabaseError> {
        let (rows, conflicted) = last_wins(source_file, rows);
        let write_failure =
            |e: libsql::Error| DatabaseError::StoreWriteFailure(format!("{source_file}: {e}"));

        let tx = self
            .db()
            .conn()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| DatabaseError::TransactionUnavailable(format!("{source_file}: {e}")))?;

        let applied = apply_rows(&tx, source_file, &rows).await;
        let mut summary = match applied {
            Ok(summary) => summary,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(file = source_file, error = %rollback, "rollback failed");
                }
                return Err(DatabaseError::StoreWriteFailure(format!("{source_file}: {e}")));
            }
        };
        summary.conflicted = conflicted;

        if dry_run {
            tx.rollback().await.map_err(write_failure)?;
        } else {
            tx.commit().await.map_err(write_failure)?;
        }

        tracing::info!(
            file = source_file,
            dry_run,
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            conflicted = summary.conflicted,
            "file reconciled"
        );
        Ok(summary)
    }

    /// Fetch one stored mark by identity key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_mark(&self, key: &IdentityKey) -> Result<Option<MarkRecord>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {MARK_COLUMNS} FROM horse_marks WHERE {KEY_FILTER}"),
                libsql::params_from_iter(key_params(key)),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_mark(&row)?)),
            None => Ok(None),
        }
    }

    /// Every stored mark for one source date, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn marks_for_date(&self, source_date: &str) -> Result<Vec<MarkRecord>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {MARK_COLUMNS} FROM horse_marks WHERE source_date = ?1
                     ORDER BY venue_code, race_number, horse_name_normalized"
                ),
                [source_date],
            )
            .await?;
        let mut marks = Vec::new();
        while let Some(row) = rows.next().await? {
            marks.push(row_to_mark(&row)?);
        }
        Ok(marks)
    }

    /// Total rows in the store.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count_marks(&self) -> Result<u64, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query("SELECT COUNT(*) FROM horse_marks", ())
            .await?;
        crate::helpers::read_count(rows).await
    }

    /// Whether any row is stored under `source_date` (incremental mode).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn has_rows_for_date(&self, source_date: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT 1 FROM horse_marks WHERE source_date = ?1 LIMIT 1",
                [source_date],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }
}

async fn apply_rows(
    tx: &libsql::Transaction,
    source_file: &str,
    rows: &[NormalizedRow],
) -> Result<UpsertSummary, DatabaseError> {
    let mut summary = UpsertSummary::default();
    let now = Utc::now().to_rfc3339();

    for row in rows {
        let stored = {
            let mut found = tx
                .query(
                    &format!(
                        "SELECT horse_name_raw, umaban, race_name, morning_odds,
                                mark1, mark2, mark3, mark4, mark5, mark6, mark7, mark8,
                                zi_index, zm_value
                         FROM horse_marks WHERE {KEY_FILTER}"
                    ),
                    libsql::params_from_iter(key_params(&row.key)),
                )
                .await?;
            match found.next().await? {
                Some(r) => Some(row_to_fields(&r, 0)?),
                None => None,
            }
        };

        let outcome = match stored {
            None => {
                insert_mark(tx, source_file, &now, row).await?;
                summary.inserted += 1;
                UpsertOutcome::Inserted
            }
            Some(existing) if existing == row.fields => {
                summary.unchanged += 1;
                UpsertOutcome::Unchanged
            }
            Some(existing) => {
                let diff = MarkDiff {
                    key: row.key.clone(),
                    changes: existing.diff(&row.fields),
                };
                update_mark(tx, source_file, &now, row).await?;
                let mut params = key_params(&row.key);
                params.push(source_file.into());
                params.push(diff.to_json().to_string().into());
                params.push(now.as_str().into());
                tx.execute(
                    "INSERT INTO mark_audit
                        (source_date, venue_code, race_number, horse_name_normalized, source_file, diff, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    libsql::params_from_iter(params),
                )
                .await?;
                for change in &diff.changes {
                    tracing::info!(file = source_file, key = %row.key, "{change}");
                }
                summary.diffs.push(diff);
                summary.updated += 1;
                UpsertOutcome::Updated
            }
        };
        tracing::debug!(
            file = source_file,
            key = %row.key,
            line = row.line,
            outcome = outcome.as_str(),
            "row reconciled"
        );
    }
    Ok(summary)
}

fn row_params(source_file: &str, now: &str, row: &NormalizedRow) -> Vec<libsql::Value> {
    let mut params = key_params(&row.key);
    params.extend(row.fields.values().iter().map(|v| match v {
        Some(text) => libsql::Value::Text((*text).to_string()),
        None => libsql::Value::Null,
    }));
    params.push(source_file.into());
    params.push(now.into());
    params
}

async fn insert_mark(
    tx: &libsql::Transaction,
    source_file: &str,
    now: &str,
    row: &NormalizedRow,
) -> Result<(), DatabaseError> {
    let placeholders: Vec<String> = (1..=20).map(|i| format!("?{i}")).collect();
    tx.execute(
        &format!(
            "INSERT INTO horse_marks ({MARK_COLUMNS}) VALUES ({})",
            placeholders.join(", ")
        ),
        libsql::params_from_iter(row_params(source_file, now, row)),
    )
    .await?;
    Ok(())
}

async fn update_mark(
    tx: &libsql::Transaction,
    source_file: &str,
    now: &str,
    row: &NormalizedRow,
) -> Result<(), DatabaseError> {
    let sets: Vec<String> = MarkFields::COLUMNS
        .iter()
        .chain(["source_file", "imported_at"].iter())
        .zip(5..)
        .map(|(column, idx)| format!("{column} = ?{idx}"))
        .collect();
    tx.execute(
        &format!("UPDATE horse_marks SET {} WHERE {KEY_FILTER}", sets.join(", ")),
        libsql::params_from_iter(row_params(source_file, now, row)),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(line: usize, name: &str, mark1: &str) -> NormalizedRow {
        NormalizedRow {
            line,
            key: IdentityKey {
                source_date: "20250928".into(),
                venue_code: "06".into(),
                race_number: "11".into(),
                horse_name_normalized: name.into(),
            },
            fields: MarkFields {
                horse_name_raw: name.into(),
                mark1: Some(mark1.into()),
                ..MarkFields::default()
            },
            warnings: Vec::new(),
            resolved_via_master: false,
        }
    }

    #[test]
    fn last_row_wins_within_a_file() {
        let rows = vec![row(2, "A", "◎"), row(3, "B", "○"), row(4, "A", "▲")];
        let (survivors, conflicted) = last_wins("f.xlsx", rows);
        assert_eq!(conflicted, 1);
        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0].key.horse_name_normalized, "A");
        assert_eq!(survivors[0].fields.mark1.as_deref(), Some("▲"));
        assert_eq!(survivors[1].key.horse_name_normalized, "B");
    }

    #[tokio::test]
    async fn insert_then_read_back() {
        let svc = MarkService::new_local(":memory:").await.unwrap();
        let summary = svc
            .reconcile_file("20250928.xlsx", vec![row(2, "A", "◎")], false)
            .await
            .unwrap();
        assert_eq!(summary.inserted, 1);

        let stored = svc.get_mark(&row(2, "A", "◎").key).await.unwrap().unwrap();
        assert_eq!(stored.fields.mark1.as_deref(), Some("◎"));
        assert_eq!(stored.source_file, "20250928.xlsx");
        assert!(stored.imported_at.is_some());
        assert!(svc.has_rows_for_date("20250928").await.unwrap());
        assert!(!svc.has_rows_for_date("20250929").await.unwrap());
    }
}
