use anyhow::Context;
use chrono::Local;
use serde_json::json;
use umaji_core::identity::IdentityNormalizer;
use umaji_core::responses::ImportReport;

use crate::cli::root_commands::ImportArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::commands::Outcome;
use crate::context::AppContext;
use crate::output::{output, render, render_array_table_with};
use crate::pipeline::{ImportOptions, ImportPipeline, discover, select};
use crate::progress::Progress;

const FILE_COLUMNS: [&str; 9] = [
    "file",
    "status",
    "header_version",
    "inserted",
    "updated",
    "unchanged",
    "conflicted",
    "skipped",
    "error",
];

/// Handle `umaji import`.
pub async fn handle(
    args: &ImportArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    let defaults = &ctx.config.import;
    let options = ImportOptions {
        mode: args.mode.map_or(defaults.mode, Into::into),
        lookback_days: args.lookback_days.unwrap_or(defaults.lookback_days),
        limit: args.limit.unwrap_or(defaults.limit),
        sheet: args
            .sheet
            .clone()
            .or_else(|| defaults.sheet().map(str::to_string)),
        dry_run: args.dry_run,
        today: Local::now().date_naive(),
    };

    let inputs = if args.paths.is_empty() {
        vec![ctx.workbook_dir()]
    } else {
        args.paths.clone()
    };
    let files = select(discover(&inputs).context("failed to collect workbooks")?, &options);
    if files.is_empty() {
        tracing::warn!(inputs = ?inputs, "no workbooks to import");
    }

    let master = if ctx.config.master.resolve_identity {
        match ctx.open_master().await {
            Ok(master) => Some(master),
            Err(error) => {
                let reason = format!("{error:#}");
                tracing::warn!(error = %reason, "identity assist disabled");
                None
            }
        }
    } else {
        None
    };

    let mut pipeline = ImportPipeline::new(&ctx.service, IdentityNormalizer::new(ctx.date_domain()));
    if let Some(master) = &master {
        pipeline = pipeline.with_master(master);
    }

    let progress = Progress::files(files.len());
    let report = match pipeline.run(&files, &options, &progress).await {
        Ok(report) => report,
        Err(error) => {
            progress.finish_err("import aborted");
            return Err(error).context("import aborted; no further files were attempted");
        }
    };
    progress.finish_batch();

    if flags.format == OutputFormat::Table {
        println!("{}", render_report_table(&report)?);
    } else {
        output(&report, flags.format)?;
    }

    Ok(if report.has_failures() {
        Outcome::PartialFailure
    } else {
        Outcome::Clean
    })
}

/// Per-file rows, then run totals, then failures by kind.
fn render_report_table(report: &ImportReport) -> anyhow::Result<String> {
    let rows: Vec<serde_json::Value> = report
        .files
        .iter()
        .map(|file| {
            json!({
                "file": file.file,
                "status": file.status.as_str(),
                "header_version": file.header_version,
                "inserted": file.inserted,
                "updated": file.updated,
                "unchanged": file.unchanged,
                "conflicted": file.conflicted,
                "skipped": file.skipped,
                "error": file.failure.as_ref().map(|f| format!("{}: {}", f.kind, f.message)),
            })
        })
        .collect();

    let mut sections = vec![
        render_array_table_with(&rows, &FILE_COLUMNS),
        render(&report.totals, OutputFormat::Table)?,
    ];
    if !report.errors_by_kind.is_empty() {
        sections.push(render(&report.errors_by_kind, OutputFormat::Table)?);
    }
    Ok(sections.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use umaji_core::enums::{ErrorKind, ImportMode};
    use umaji_core::responses::{ImportFileSummary, ImportReport};

    use super::render_report_table;

    #[test]
    fn table_lists_files_totals_and_error_kinds() {
        let mut ok = ImportFileSummary::new("20250928.xlsx", Some("20250928".into()));
        ok.inserted = 12;
        let mut bad = ImportFileSummary::new("20250929.xlsx", Some("20250929".into()));
        bad.fail(ErrorKind::UnreadableWorkbook, "file not found");
        let report = ImportReport::from_files(ImportMode::Full, false, vec![ok, bad]);

        let table = render_report_table(&report).unwrap();
        assert!(table.contains("20250928.xlsx"));
        assert!(table.contains("committed"));
        assert!(table.contains("unreadable_workbook: file not found"));
        assert!(table.contains("files_failed"));
        assert!(table.contains("inserted"));
    }
}
