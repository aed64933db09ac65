use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

mod bootstrap;
mod cli;
mod commands;
mod context;
mod output;
mod pipeline;
mod progress;
mod ui;
mod write_lock;

use commands::Outcome;
use write_lock::WriteOperation;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::PartialFailure) => ExitCode::from(2),
        Err(error) => {
            eprintln!("umaji error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<Outcome> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let flags = cli.global_flags();
    ui::init(&flags);

    if let cli::Commands::Schema(args) = &cli.command {
        return commands::schema::handle(args, &flags);
    }

    let project_root = context::resolve_project_root(flags.project.as_deref())?;
    let config = bootstrap::load_config(&project_root)?;
    context::warn_mistyped_env();

    if let cli::Commands::Headers(args) = &cli.command {
        return commands::headers::handle(args, &config, &flags);
    }

    let command = cli.command;
    let write_lock = match write_operation(&command) {
        Some(operation) => Some(write_lock::acquire_for_project(&project_root, operation).await?),
        None => None,
    };

    let ctx = context::AppContext::init(project_root, config)
        .await
        .context("failed to initialize umaji application context")?;

    let result = commands::dispatch::dispatch(command, &ctx, &flags).await;
    drop(write_lock);
    result
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("UMAJI_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

/// Writing commands serialize on `.umaji/store.write.lock`.
const fn write_operation(command: &cli::Commands) -> Option<WriteOperation> {
    match command {
        cli::Commands::Import(args) if !args.dry_run => Some(WriteOperation::Import),
        cli::Commands::Quarantine(args) if args.confirm => Some(WriteOperation::Quarantine),
        _ => None,
    }
}
