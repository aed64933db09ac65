use crate::cli::GlobalFlags;
use crate::commands::Outcome;
use crate::context::AppContext;
use crate::output::output;

/// Handle `umaji detect-anomalies`. Read-only; finding anomalies is not a
/// failure.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<Outcome> {
    let report = ctx.service.detect_anomalies(&ctx.date_domain()).await?;
    output(&report, flags.format)?;
    Ok(Outcome::Clean)
}
