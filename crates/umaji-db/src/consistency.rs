//! Cross-Store Consistency Checker.
//!
//! Compares `(venue_code, race_number, horse_name_normalized)` triples for one
//! date between the master feed and the mark store. Master names pass through
//! the same normalizer as imported names before comparison.

use std::collections::{BTreeMap, BTreeSet};

use umaji_core::date_domain::DateDomain;
use umaji_core::responses::{ConsistencyReport, MissingMark, OrphanMark};

use crate::error::DatabaseError;
use crate::master::MasterFeed;
use crate::service::MarkService;

type Triple = (String, String, String);

impl MarkService {
    /// Report the gaps between master runners and stored marks on `date`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidDate` when `date` fails the date
    /// domain, or `DatabaseError` if either store cannot be read.
    pub async fn check_consistency(
        &self,
        master: &MasterFeed,
        date: &str,
        domain: &DateDomain,
    ) -> Result<ConsistencyReport, DatabaseError> {
        domain.check(date).map_err(|violation| DatabaseError::InvalidDate {
            value: date.to_string(),
            reason: violation.to_string(),
        })?;

        let runners = master.runners_for_date(date).await?;
        let titles: BTreeMap<(String, String), Option<String>> = master
            .races_for_date(date)
            .await?
            .into_iter()
            .map(|race| ((race.venue_code, race.race_number), race.title))
            .collect();
        let marks = self.marks_for_date(date).await?;

        let master_triples: BTreeSet<Triple> = runners
            .iter()
            .map(|r| {
                (
                    r.venue_code.clone(),
                    r.race_number.clone(),
                    r.horse_name_normalized.clone(),
                )
            })
            .collect();
        let mark_triples: BTreeSet<Triple> = marks
            .iter()
            .map(|m| {
                (
                    m.key.venue_code.clone(),
                    m.key.race_number.clone(),
                    m.key.horse_name_normalized.clone(),
                )
            })
            .collect();

        let races_without_marks: Vec<MissingMark> = runners
            .iter()
            .filter(|r| {
                !mark_triples.contains(&(
                    r.venue_code.clone(),
                    r.race_number.clone(),
                    r.horse_name_normalized.clone(),
                ))
            })
            .map(|r| MissingMark {
                venue_code: r.venue_code.clone(),
                race_number: r.race_number.clone(),
                horse_name_normalized: r.horse_name_normalized.clone(),
                umaban: r.umaban.clone(),
                race_title: titles
                    .get(&(r.venue_code.clone(), r.race_number.clone()))
                    .cloned()
                    .flatten(),
            })
            .collect();

        let orphan_marks: Vec<OrphanMark> = marks
            .iter()
            .filter(|m| {
                !master_triples.contains(&(
                    m.key.venue_code.clone(),
                    m.key.race_number.clone(),
                    m.key.horse_name_normalized.clone(),
                ))
            })
            .map(|m| OrphanMark {
                venue_code: m.key.venue_code.clone(),
                race_number: m.key.race_number.clone(),
                horse_name_normalized: m.key.horse_name_normalized.clone(),
                horse_name_raw: m.fields.horse_name_raw.clone(),
                candidates: races_without_marks
                    .iter()
                    .filter(|gap| {
                        gap.venue_code == m.key.venue_code && gap.race_number == m.key.race_number
                    })
                    .map(|gap| gap.horse_name_normalized.clone())
                    .collect(),
            })
            .collect();

        let report = ConsistencyReport {
            date: date.to_string(),
            master_rows: u64::try_from(runners.len()).unwrap_or(u64::MAX),
            mark_rows: u64::try_from(marks.len()).unwrap_or(u64::MAX),
            races_without_marks,
            orphan_marks,
        };
        tracing::info!(
            date,
            master = report.master_rows,
            marks = report.mark_rows,
            missing = report.races_without_marks.len(),
            orphans = report.orphan_marks.len(),
            "consistency check complete"
        );
        Ok(report)
    }
}
