use anyhow::Context;
use serde_json::json;
use umaji_core::responses::ConsistencyReport;

use crate::cli::root_commands::CheckConsistencyArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::commands::Outcome;
use crate::context::AppContext;
use crate::output::{output, render_array_table_with};

/// Handle `umaji check-consistency`. Gaps are findings, not failures.
pub async fn handle(
    args: &CheckConsistencyArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    let master = ctx.open_master().await?;
    let report = ctx
        .service
        .check_consistency(&master, &args.date, &ctx.date_domain())
        .await
        .with_context(|| format!("consistency check for {} failed", args.date))?;

    if flags.format == OutputFormat::Table {
        println!("{}", render_report_table(&report));
    } else {
        output(&report, flags.format)?;
    }
    Ok(Outcome::Clean)
}

fn render_report_table(report: &ConsistencyReport) -> String {
    let missing: Vec<serde_json::Value> = report
        .races_without_marks
        .iter()
        .map(|gap| {
            json!({
                "venue": gap.venue_code,
                "race": gap.race_number,
                "umaban": gap.umaban,
                "horse": gap.horse_name_normalized,
                "title": gap.race_title,
            })
        })
        .collect();
    let orphans: Vec<serde_json::Value> = report
        .orphan_marks
        .iter()
        .map(|orphan| {
            json!({
                "venue": orphan.venue_code,
                "race": orphan.race_number,
                "horse": orphan.horse_name_raw,
                "candidates": orphan.candidates.join(" / "),
            })
        })
        .collect();

    format!(
        "{} master runners, {} marks on {}\n\nraces without marks\n{}\n\norphan marks\n{}",
        report.master_rows,
        report.mark_rows,
        report.date,
        render_array_table_with(&missing, &["venue", "race", "umaban", "horse", "title"]),
        render_array_table_with(&orphans, &["venue", "race", "horse", "candidates"]),
    )
}
