use umaji_core::responses::QuarantinePreview;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::QuarantineArgs;
use crate::commands::Outcome;
use crate::context::AppContext;
use crate::output::output;
use crate::progress::Progress;

/// Handle `umaji quarantine`. Without `--confirm` only the plan is printed.
pub async fn handle(
    args: &QuarantineArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    let domain = ctx.date_domain();
    let plan = ctx.service.quarantine_plan(&domain).await?;

    if !args.confirm {
        let hint = if plan.is_empty() {
            "no malformed source_date values; nothing to quarantine".to_string()
        } else {
            format!(
                "{} row(s) would be deleted after a full backup to {}; re-run with --confirm",
                plan.row_count,
                ctx.backup_dir().display()
            )
        };
        output(
            &QuarantinePreview {
                confirmed: false,
                plan,
                hint,
            },
            flags.format,
        )?;
        return Ok(Outcome::Clean);
    }

    let progress = Progress::spinner("backing up and quarantining");
    let report = match ctx
        .service
        .execute_quarantine(&plan, true, &ctx.backup_dir(), &domain)
        .await
    {
        Ok(report) => {
            progress.finish_ok(&format!("deleted {} row(s)", report.deleted));
            report
        }
        Err(error) => {
            progress.finish_err("quarantine aborted; store untouched");
            return Err(error.into());
        }
    };
    output(&report, flags.format)?;
    Ok(Outcome::Clean)
}
