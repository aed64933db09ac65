use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands::{self, Outcome};
use crate::context::AppContext;

/// Dispatch a store-backed command to its handler. `headers` and `schema`
/// never open the store and are handled in `main`.
pub async fn dispatch(
    command: Commands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    match command {
        Commands::Import(args) => commands::import::handle(&args, ctx, flags).await,
        Commands::CheckConsistency(args) => {
            commands::check_consistency::handle(&args, ctx, flags).await
        }
        Commands::DetectAnomalies => commands::detect_anomalies::handle(ctx, flags).await,
        Commands::Quarantine(args) => commands::quarantine::handle(&args, ctx, flags).await,
        Commands::Audit(args) => commands::audit::handle(&args, ctx, flags).await,
        Commands::Headers(_) | Commands::Schema(_) => {
            anyhow::bail!("headers and schema do not use the mark store")
        }
    }
}
