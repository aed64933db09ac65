use serde_json::{Value, json};
use umaji_core::entities::MarkAuditEntry;
use umaji_core::normalize;
use umaji_db::repos::audit::AuditFilter;

use crate::cli::root_commands::AuditArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::commands::Outcome;
use crate::context::AppContext;
use crate::output::{output, render_array_table_with};

const AUDIT_COLUMNS: [&str; 7] = [
    "id",
    "source_date",
    "venue_code",
    "race_number",
    "horse",
    "file",
    "changes",
];

/// Handle `umaji audit`. Read-only.
pub async fn handle(
    args: &AuditArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    if let Some(date) = &args.date {
        if let Err(violation) = ctx.date_domain().check(date) {
            anyhow::bail!("invalid --date '{date}': {violation}");
        }
    }

    let filter = AuditFilter {
        key: None,
        source_date: args.date.clone(),
        horse_name_normalized: args.horse.as_deref().map(normalize::horse_name),
        source_file: args.file.clone(),
        limit: args.limit,
    };
    let entries = ctx.service.query_audit(&filter).await?;
    tracing::debug!(entries = entries.len(), "audit entries loaded");

    if flags.format == OutputFormat::Table {
        println!("{}", render_audit_table(&entries));
    } else {
        output(&entries, flags.format)?;
    }
    Ok(Outcome::Clean)
}

fn render_audit_table(entries: &[MarkAuditEntry]) -> String {
    let rows: Vec<Value> = entries
        .iter()
        .map(|entry| {
            json!({
                "id": entry.id,
                "source_date": entry.key.source_date,
                "venue_code": entry.key.venue_code,
                "race_number": entry.key.race_number,
                "horse": entry.key.horse_name_normalized,
                "file": entry.source_file,
                "changes": changes_text(&entry.diff),
            })
        })
        .collect();
    render_array_table_with(&rows, &AUDIT_COLUMNS)
}

/// `{"mark5": {"old": "A", "new": "B"}}` → `mark5: A→B`. Nulls show as `-`.
fn changes_text(diff: &Value) -> String {
    let Some(fields) = diff.as_object() else {
        return diff.to_string();
    };
    let side = |change: &Value, name: &str| match change.get(name) {
        Some(Value::String(text)) => text.clone(),
        None | Some(Value::Null) => "-".to_string(),
        Some(other) => other.to_string(),
    };
    fields
        .iter()
        .map(|(field, change)| {
            format!("{field}: {}→{}", side(change, "old"), side(change, "new"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use umaji_core::entities::{IdentityKey, MarkAuditEntry};

    use super::{changes_text, render_audit_table};

    #[test]
    fn diffs_read_as_old_to_new() {
        let diff = json!({
            "mark1": { "old": "◎", "new": "○" },
            "mark5": { "old": null, "new": "B" },
        });
        assert_eq!(changes_text(&diff), "mark1: ◎→○, mark5: -→B");
    }

    #[test]
    fn table_lists_one_row_per_change() {
        let entry = MarkAuditEntry {
            id: 7,
            key: IdentityKey {
                source_date: "20250928".into(),
                venue_code: "06".into(),
                race_number: "11".into(),
                horse_name_normalized: "ナムラクレア".into(),
            },
            source_file: "20250928_v2.xlsx".into(),
            diff: json!({ "mark5": { "old": "A", "new": "B" } }),
            created_at: Utc::now(),
        };

        let table = render_audit_table(&[entry]);
        assert!(table.contains("20250928_v2.xlsx"));
        assert!(table.contains("mark5: A→B"));
        assert_eq!(render_audit_table(&[]), "(no rows)");
    }
}
