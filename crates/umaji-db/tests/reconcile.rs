//! Reconciliation/Upsert Engine against scratch stores.

use pretty_assertions::assert_eq;

use umaji_core::entities::{IdentityKey, MarkFields};
use umaji_core::identity::NormalizedRow;
use umaji_db::error::DatabaseError;
use umaji_db::repos::audit::AuditFilter;
use umaji_db::service::MarkService;

async fn test_service() -> MarkService {
    MarkService::new_local(":memory:").await.unwrap()
}

fn key(race: &str, name: &str) -> IdentityKey {
    IdentityKey {
        source_date: "20250928".into(),
        venue_code: "06".into(),
        race_number: race.into(),
        horse_name_normalized: name.into(),
    }
}

fn row(line: usize, race: &str, name: &str, mark5: Option<&str>) -> NormalizedRow {
    NormalizedRow {
        line,
        key: key(race, name),
        fields: MarkFields {
            horse_name_raw: name.into(),
            umaban: Some("6".into()),
            mark1: Some("◎".into()),
            mark5: mark5.map(String::from),
            zi_index: Some("102".into()),
            ..MarkFields::default()
        },
        warnings: Vec::new(),
        resolved_via_master: false,
    }
}

fn batch() -> Vec<NormalizedRow> {
    vec![
        row(2, "11", "ナムラクレア", Some("A")),
        row(3, "11", "トウシンマカオ", None),
        row(4, "10", "ママコチャ", Some("C")),
    ]
}

#[tokio::test]
async fn reimport_is_idempotent() {
    let svc = test_service().await;

    let first = svc.reconcile_file("20250928.xlsx", batch(), false).await.unwrap();
    assert_eq!((first.inserted, first.updated, first.unchanged), (3, 0, 0));

    let second = svc.reconcile_file("20250928.xlsx", batch(), false).await.unwrap();
    assert_eq!((second.inserted, second.updated, second.unchanged), (0, 0, 3));
    assert!(second.diffs.is_empty());
    assert_eq!(svc.count_marks().await.unwrap(), 3);
}

#[tokio::test]
async fn provenance_alone_does_not_count_as_a_change() {
    let svc = test_service().await;
    svc.reconcile_file("20250928.xlsx", batch(), false).await.unwrap();

    let renamed = svc.reconcile_file("20250928_copy.xlsx", batch(), false).await.unwrap();
    assert_eq!(renamed.unchanged, 3);

    let stored = svc.get_mark(&key("11", "ナムラクレア")).await.unwrap().unwrap();
    assert_eq!(stored.source_file, "20250928.xlsx");
}

#[tokio::test]
async fn changed_mark_is_updated_with_audited_diff() {
    let svc = test_service().await;
    svc.reconcile_file("20250928.xlsx", batch(), false).await.unwrap();

    let mut changed = batch();
    changed[0].fields.mark5 = Some("B".into());
    let summary = svc.reconcile_file("20250928_v2.xlsx", changed, false).await.unwrap();

    assert_eq!((summary.updated, summary.unchanged), (1, 2));
    assert_eq!(summary.diffs.len(), 1);
    assert_eq!(summary.diffs[0].key, key("11", "ナムラクレア"));
    assert_eq!(summary.diffs[0].changes[0].to_string(), "mark5: A→B");

    let stored = svc.get_mark(&key("11", "ナムラクレア")).await.unwrap().unwrap();
    assert_eq!(stored.fields.mark5.as_deref(), Some("B"));
    assert_eq!(stored.source_file, "20250928_v2.xlsx");

    let audit = svc
        .query_audit(&AuditFilter {
            key: Some(key("11", "ナムラクレア")),
            ..AuditFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].source_file, "20250928_v2.xlsx");
    assert_eq!(
        audit[0].diff,
        serde_json::json!({ "mark5": { "old": "A", "new": "B" } })
    );
}

#[tokio::test]
async fn clearing_a_mark_is_an_update() {
    let svc = test_service().await;
    svc.reconcile_file("20250928.xlsx", batch(), false).await.unwrap();

    let mut cleared = batch();
    cleared[2].fields.mark5 = None;
    let summary = svc.reconcile_file("20250928.xlsx", cleared, false).await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.diffs[0].changes[0].new, None);
}

#[tokio::test]
async fn duplicate_keys_in_one_file_keep_the_last_row() {
    let svc = test_service().await;
    let mut rows = batch();
    rows.push(row(9, "11", "ナムラクレア", Some("Z")));

    let summary = svc.reconcile_file("20250928.xlsx", rows, false).await.unwrap();
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.conflicted, 1);

    let stored = svc.get_mark(&key("11", "ナムラクレア")).await.unwrap().unwrap();
    assert_eq!(stored.fields.mark5.as_deref(), Some("Z"));
    assert_eq!(svc.count_marks().await.unwrap(), 3);
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let svc = test_service().await;
    let summary = svc.reconcile_file("20250928.xlsx", batch(), true).await.unwrap();
    assert_eq!(summary.inserted, 3);
    assert_eq!(svc.count_marks().await.unwrap(), 0);

    svc.reconcile_file("20250928.xlsx", batch(), false).await.unwrap();
    let mut changed = batch();
    changed[0].fields.mark5 = Some("B".into());
    let preview = svc.reconcile_file("20250928.xlsx", changed, true).await.unwrap();
    assert_eq!(preview.updated, 1);

    let stored = svc.get_mark(&key("11", "ナムラクレア")).await.unwrap().unwrap();
    assert_eq!(stored.fields.mark5.as_deref(), Some("A"));
    assert!(svc.query_audit(&AuditFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn marks_for_date_is_ordered_by_key() {
    let svc = test_service().await;
    svc.reconcile_file("20250928.xlsx", batch(), false).await.unwrap();

    let marks = svc.marks_for_date("20250928").await.unwrap();
    let names: Vec<&str> = marks
        .iter()
        .map(|m| m.key.horse_name_normalized.as_str())
        .collect();
    assert_eq!(names, vec!["ママコチャ", "トウシンマカオ", "ナムラクレア"]);
    assert!(svc.marks_for_date("20250929").await.unwrap().is_empty());
}

#[tokio::test]
async fn held_write_lock_makes_the_transaction_unavailable() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("marks.db");
    let svc = MarkService::new_local(&path.to_string_lossy()).await.unwrap();
    svc.db()
        .set_busy_timeout(std::time::Duration::from_millis(50))
        .unwrap();

    let other = libsql::Builder::new_local(&path).build().await.unwrap();
    let writer = other.connect().unwrap();
    writer.execute("BEGIN EXCLUSIVE", ()).await.unwrap();

    let error = svc
        .reconcile_file("20250928.xlsx", batch(), false)
        .await
        .unwrap_err();
    assert!(error.is_fatal());
    assert!(matches!(error, DatabaseError::TransactionUnavailable(_)));

    writer.execute("ROLLBACK", ()).await.unwrap();
    let summary = svc.reconcile_file("20250928.xlsx", batch(), false).await.unwrap();
    assert_eq!(summary.inserted, 3);
}

#[tokio::test]
async fn audit_filters_by_date_horse_and_file() {
    let svc = test_service().await;
    svc.reconcile_file("20250928.xlsx", batch(), false).await.unwrap();
    let mut changed = batch();
    changed[0].fields.mark5 = Some("B".into());
    changed[2].fields.mark5 = Some("D".into());
    svc.reconcile_file("20250928_v2.xlsx", changed, false).await.unwrap();

    let by_date = svc
        .query_audit(&AuditFilter {
            source_date: Some("20250928".into()),
            ..AuditFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_date.len(), 2);

    let by_horse = svc
        .query_audit(&AuditFilter {
            horse_name_normalized: Some("ママコチャ".into()),
            source_file: Some("20250928_v2.xlsx".into()),
            ..AuditFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_horse.len(), 1);
    assert_eq!(by_horse[0].diff["mark5"]["new"], "D");

    let other_day = svc
        .query_audit(&AuditFilter {
            source_date: Some("20250929".into()),
            limit: Some(5),
            ..AuditFilter::default()
        })
        .await
        .unwrap();
    assert!(other_day.is_empty());
}
