//! `mark_audit` repository.
//!
//! Rows are appended by `reconcile_file` inside the file's transaction; this
//! module only reads them back.

use umaji_core::entities::{IdentityKey, MarkAuditEntry};

use crate::error::DatabaseError;
use crate::helpers::parse_datetime;
use crate::service::MarkService;

/// Filter criteria for audit queries.
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub key: Option<IdentityKey>,
    pub source_date: Option<String>,
    pub horse_name_normalized: Option<String>,
    pub source_file: Option<String>,
    pub limit: Option<u32>,
}

fn row_to_audit(row: &libsql::Row) -> Result<MarkAuditEntry, DatabaseError> {
    let diff_text = row.get::<String>(6)?;
    Ok(MarkAuditEntry {
        id: row.get::<i64>(0)?,
        key: IdentityKey {
            source_date: row.get::<String>(1)?,
            venue_code: row.get::<String>(2)?,
            race_number: row.get::<String>(3)?,
            horse_name_normalized: row.get::<String>(4)?,
        },
        source_file: row.get::<String>(5)?,
        diff: serde_json::from_str(&diff_text)
            .map_err(|e| DatabaseError::Query(format!("Invalid JSON in mark_audit.diff: {e}")))?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

impl MarkService {
    /// Query audit entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a stored diff is not JSON.
    pub async fn query_audit(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<MarkAuditEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref key) = filter.key {
            for (column, value) in [
                ("source_date", &key.source_date),
                ("venue_code", &key.venue_code),
                ("race_number", &key.race_number),
                ("horse_name_normalized", &key.horse_name_normalized),
            ] {
                params.push(libsql::Value::Text(value.clone()));
                conditions.push(format!("{column} = ?{}", params.len()));
            }
        }
        for (column, value) in [
            ("source_date", &filter.source_date),
            ("horse_name_normalized", &filter.horse_name_normalized),
        ] {
            if let Some(value) = value {
                params.push(libsql::Value::Text(value.clone()));
                conditions.push(format!("{column} = ?{}", params.len()));
            }
        }
        if let Some(ref file) = filter.source_file {
            params.push(libsql::Value::Text(file.clone()));
            conditions.push(format!("source_file = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit_clause = filter
            .limit
            .map_or_else(String::new, |n| format!("LIMIT {n}"));

        let sql = format!(
            "SELECT id, source_date, venue_code, race_number, horse_name_normalized,
                    source_file, diff, created_at
             FROM mark_audit {where_clause} ORDER BY id {limit_clause}"
        );
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_audit(&row)?);
        }
        Ok(entries)
    }
}
