//! Anomaly detection and two-phase quarantine on a file-backed store.

use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use umaji_core::date_domain::DateDomain;
use umaji_db::error::DatabaseError;
use umaji_db::service::MarkService;

async fn seeded_store(dir: &Path) -> MarkService {
    let path = dir.join("marks.db");
    let svc = MarkService::new_local(&path.display().to_string()).await.unwrap();
    let rows = [
        ("20250928", "06", "11", "ナムラクレア", "ナムラクレア"),
        ("20250928", "06", "11", "トウシンマカオ", "トウシンマカオ"),
        ("2502509", "06", "11", "ナムラクレア", "ナムラクレア"),
        ("25025XX", "06", "10", "ママコチャ", "ママコチャ"),
        ("19001231", "05", "01", "ウマ", "ウマ"),
        ("20250928", "11", "13", "ソングライン", "ソングライン(外)"),
    ];
    for (date, venue, race, normalized, raw) in rows {
        svc.db()
            .conn()
            .execute(
                "INSERT INTO horse_marks
                    (source_date, venue_code, race_number, horse_name_normalized, horse_name_raw, source_file)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'seed.xlsx')",
                libsql::params![date, venue, race, normalized, raw],
            )
            .await
            .unwrap();
    }
    svc
}

#[tokio::test]
async fn detection_groups_malformed_dates_by_pattern() {
    let dir = TempDir::new().unwrap();
    let svc = seeded_store(dir.path()).await;

    let report = svc.detect_anomalies(&DateDomain::default()).await.unwrap();
    assert_eq!(report.scanned_rows, 6);
    assert_eq!(report.malformed_row_count(), 3);

    let patterns: Vec<&str> = report.malformed_dates.iter().map(|g| g.pattern.as_str()).collect();
    assert_eq!(patterns, vec!["19001", "25025"]);
    let group = &report.malformed_dates[1];
    assert_eq!(group.count, 2);
    assert_eq!(group.values, vec!["2502509".to_string(), "25025XX".to_string()]);
    assert_eq!(group.reasons, vec!["not_eight_digits".to_string()]);
    assert_eq!(report.malformed_dates[0].reasons, vec!["implausible_year".to_string()]);

    assert_eq!(report.venue_violations.len(), 1);
    assert_eq!(report.venue_violations[0].venue_code, "11");
    assert_eq!(report.race_violations.len(), 1);
    assert!(report.stale_normalizations.is_empty());
    assert!(report.duplicate_keys.is_empty());
}

#[tokio::test]
async fn detection_is_read_only() {
    let dir = TempDir::new().unwrap();
    let svc = seeded_store(dir.path()).await;
    svc.detect_anomalies(&DateDomain::default()).await.unwrap();
    svc.quarantine_plan(&DateDomain::default()).await.unwrap();
    assert_eq!(svc.count_marks().await.unwrap(), 6);
}

#[tokio::test]
async fn unconfirmed_quarantine_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let svc = seeded_store(dir.path()).await;
    let domain = DateDomain::default();
    let plan = svc.quarantine_plan(&domain).await.unwrap();

    let result = svc
        .execute_quarantine(&plan, false, &dir.path().join("backups"), &domain)
        .await;
    assert!(matches!(result, Err(DatabaseError::QuarantineNotConfirmed)));
    assert_eq!(svc.count_marks().await.unwrap(), 6);
    assert!(!dir.path().join("backups").exists());
}

#[tokio::test]
async fn confirmed_quarantine_backs_up_then_deletes() {
    let dir = TempDir::new().unwrap();
    let svc = seeded_store(dir.path()).await;
    let domain = DateDomain::default();
    let plan = svc.quarantine_plan(&domain).await.unwrap();
    assert_eq!(plan.row_count, 3);

    let backups = dir.path().join("backups");
    let report = svc
        .execute_quarantine(&plan, true, &backups, &domain)
        .await
        .unwrap();

    assert_eq!(report.rows_before, 6);
    assert_eq!(report.backup_rows, 6);
    assert_eq!(report.deleted, 3);
    assert_eq!(report.rows_after, 3);

    let backup_path = report.backup_path.unwrap();
    assert!(Path::new(&backup_path).is_file());
    let file_name = Path::new(&backup_path).file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("marks_backup_"));
    assert!(file_name.ends_with(".db"));

    let after = svc.detect_anomalies(&domain).await.unwrap();
    assert_eq!(after.malformed_row_count(), 0);
}

#[tokio::test]
async fn quarantine_rechecks_the_predicate() {
    let dir = TempDir::new().unwrap();
    let svc = seeded_store(dir.path()).await;

    // Planned under a wide year range, executed under the default one.
    let lenient = DateDomain::new(1800, 2099);
    let mut plan = svc.quarantine_plan(&lenient).await.unwrap();
    plan.malformed_values.push("20250928".into());

    let report = svc
        .execute_quarantine(&plan, true, &dir.path().join("backups"), &DateDomain::default())
        .await
        .unwrap();
    assert_eq!(report.deleted, 2);
    assert!(!report.deleted_values.contains(&"20250928".to_string()));
    assert!(svc.has_rows_for_date("20250928").await.unwrap());
    assert!(svc.has_rows_for_date("19001231").await.unwrap());
}

#[tokio::test]
async fn failed_backup_aborts_before_delete() {
    let dir = TempDir::new().unwrap();
    let svc = seeded_store(dir.path()).await;
    let domain = DateDomain::default();
    let plan = svc.quarantine_plan(&domain).await.unwrap();

    let not_a_dir = dir.path().join("backups");
    std::fs::write(&not_a_dir, b"occupied").unwrap();

    let result = svc.execute_quarantine(&plan, true, &not_a_dir, &domain).await;
    assert!(matches!(result, Err(DatabaseError::QuarantineBackupFailure(_))));
    assert_eq!(svc.count_marks().await.unwrap(), 6);
}

#[tokio::test]
async fn empty_plan_takes_no_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("marks.db");
    let svc = MarkService::new_local(&path.display().to_string()).await.unwrap();
    let domain = DateDomain::default();
    let plan = svc.quarantine_plan(&domain).await.unwrap();
    assert!(plan.is_empty());

    let report = svc
        .execute_quarantine(&plan, true, &dir.path().join("backups"), &domain)
        .await
        .unwrap();
    assert_eq!(report.backup_path, None);
    assert_eq!(report.deleted, 0);
}
