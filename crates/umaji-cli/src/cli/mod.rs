use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, ImportModeArg, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `umaji` binary.
#[derive(Debug, Parser)]
#[command(name = "umaji", version, about = "umaji - handicapper mark import and reconciliation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only, no progress)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root path (defaults to auto-detect via .umaji)
    #[arg(short, long, global = true)]
    pub project: Option<String>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            project: self.project.clone(),
        }
    }
}
