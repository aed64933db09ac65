//! Read-only access to the external master-data feed.
//!
//! The feed is a `SQLite` file maintained by another tool, holding
//! `N_RACE(Year, MonthDay, JyoCD, Kaiji, Nichiji, RaceNum, Hondai, Kyori, GradeCD)`
//! and `N_UMA_RACE(Year, MonthDay, JyoCD, Kaiji, Nichiji, RaceNum, Umaban, Bamei)`.
//! Column storage classes vary between feed versions, so every column is read
//! leniently and codes are re-normalized.

use std::path::Path;

use umaji_core::entities::{MasterRunner, RaceReference};
use umaji_core::identity::MasterSnapshot;
use umaji_core::normalize;

use crate::error::DatabaseError;
use crate::helpers::get_text_lenient;

/// Handle on the master feed. Only issues `SELECT`s.
pub struct MasterFeed {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

/// `"6"`, `"06"` and `6` all become `"06"`.
fn pad_code(raw: &str) -> String {
    let text = normalize::text(raw);
    if text.len() == 1 && text.bytes().all(|b| b.is_ascii_digit()) {
        format!("0{text}")
    } else {
        text
    }
}

fn split_date(date: &str) -> Result<(&str, &str), DatabaseError> {
    if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
        Ok((&date[..4], &date[4..]))
    } else {
        Err(DatabaseError::InvalidDate {
            value: date.to_string(),
            reason: "expected YYYYMMDD".into(),
        })
    }
}

impl MasterFeed {
    /// Open an existing feed file. A missing file is never created.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::MasterUnavailable` when the file is absent or
    /// cannot be opened.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        if !path.is_file() {
            return Err(DatabaseError::MasterUnavailable(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let unavailable = |e: libsql::Error| {
            DatabaseError::MasterUnavailable(format!("{}: {e}", path.display()))
        };
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(unavailable)?;
        let conn = db.connect().map_err(unavailable)?;
        tracing::debug!(path = %path.display(), "master feed opened");
        Ok(Self { db, conn })
    }

    /// Every runner on `date` (`YYYYMMDD`), names normalized.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the date is not 8 digits or the query fails.
    pub async fn runners_for_date(&self, date: &str) -> Result<Vec<MasterRunner>, DatabaseError> {
        let (year, month_day) = split_date(date)?;
        let mut rows = self
            .conn
            .query(
                "SELECT JyoCD, RaceNum, Umaban, Bamei FROM N_UMA_RACE
                 WHERE Year = ?1 AND MonthDay = ?2
                 ORDER BY JyoCD, RaceNum, Umaban",
                [year, month_day],
            )
            .await?;

        let mut runners = Vec::new();
        while let Some(row) = rows.next().await? {
            let venue_code = get_text_lenient(&row, 0)?.map(|v| pad_code(&v));
            let race_number = get_text_lenient(&row, 1)?
                .and_then(|r| normalize::race_number(&r).ok());
            let name = get_text_lenient(&row, 3)?;
            let (Some(venue_code), Some(race_number), Some(horse_name_raw)) =
                (venue_code, race_number, name)
            else {
                tracing::debug!(date, "master runner without venue, race, or name; ignored");
                continue;
            };
            runners.push(MasterRunner {
                source_date: date.to_string(),
                horse_name_normalized: normalize::horse_name(&horse_name_raw),
                venue_code,
                race_number,
                umaban: get_text_lenient(&row, 2)?,
                horse_name_raw,
            });
        }
        Ok(runners)
    }

    /// Race metadata on `date` (`YYYYMMDD`).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the date is not 8 digits or the query fails.
    pub async fn races_for_date(&self, date: &str) -> Result<Vec<RaceReference>, DatabaseError> {
        let (year, month_day) = split_date(date)?;
        let mut rows = self
            .conn
            .query(
                "SELECT JyoCD, RaceNum, Hondai, Kyori, GradeCD FROM N_RACE
                 WHERE Year = ?1 AND MonthDay = ?2
                 ORDER BY JyoCD, RaceNum",
                [year, month_day],
            )
            .await?;

        let mut races = Vec::new();
        while let Some(row) = rows.next().await? {
            let venue_code = get_text_lenient(&row, 0)?.map(|v| pad_code(&v));
            let race_number = get_text_lenient(&row, 1)?
                .and_then(|r| normalize::race_number(&r).ok());
            let (Some(venue_code), Some(race_number)) = (venue_code, race_number) else {
                continue;
            };
            races.push(RaceReference {
                year: year.to_string(),
                month_day: month_day.to_string(),
                venue_code,
                race_number,
                title: get_text_lenient(&row, 2)?,
                distance: get_text_lenient(&row, 3)?,
                grade: get_text_lenient(&row, 4)?,
            });
        }
        Ok(races)
    }

    /// Runners for several dates, for the normalizer's identity assist.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any per-date query fails.
    pub async fn snapshot(&self, dates: &[String]) -> Result<MasterSnapshot, DatabaseError> {
        let mut runners = Vec::new();
        for date in dates {
            runners.extend(self.runners_for_date(date).await?);
        }
        Ok(MasterSnapshot::new(runners))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("6", "06")]
    #[case("06", "06")]
    #[case("１０", "10")]
    fn codes_are_padded(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(pad_code(raw), expected);
    }

    #[test]
    fn dates_split_into_year_and_month_day() {
        assert_eq!(split_date("20250928").unwrap(), ("2025", "0928"));
        assert!(split_date("2502509").is_err());
    }

    #[tokio::test]
    async fn missing_feed_is_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = MasterFeed::open(&dir.path().join("master.db")).await;
        assert!(matches!(result, Err(DatabaseError::MasterUnavailable(_))));
    }
}
