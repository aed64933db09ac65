use umaji_config::UmajiConfig;
use umaji_core::responses::HeaderSurvey;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::HeadersArgs;
use crate::commands::Outcome;
use crate::output::output;
use crate::pipeline::discover;

/// Handle `umaji headers`. Reads header rows only; never opens the store.
pub fn handle(
    args: &HeadersArgs,
    config: &UmajiConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    let sheet = args
        .sheet
        .as_deref()
        .or_else(|| config.import.sheet());
    let surveys: Vec<HeaderSurvey> = discover(&args.paths)?
        .iter()
        .map(|file| umaji_workbook::survey(&file.path, sheet))
        .collect();

    output(&surveys, flags.format)?;

    Ok(if surveys.iter().any(|s| s.error.is_some()) {
        Outcome::PartialFailure
    } else {
        Outcome::Clean
    })
}
