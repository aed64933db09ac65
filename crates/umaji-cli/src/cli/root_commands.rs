use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::cli::ImportModeArg;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Import mark workbooks into the store.
    Import(ImportArgs),
    /// Compare one date's marks against the master feed.
    CheckConsistency(CheckConsistencyArgs),
    /// Scan the store for domain violations (read-only).
    DetectAnomalies,
    /// Back up the store and delete rows with malformed dates.
    Quarantine(QuarantineArgs),
    /// List recorded mark changes, oldest first.
    Audit(AuditArgs),
    /// Show how workbook headers map onto canonical fields.
    Headers(HeadersArgs),
    /// Print the JSON Schema of a report type.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct ImportArgs {
    /// Workbook files or directories (defaults to `import.workbook_dir`)
    pub paths: Vec<PathBuf>,

    /// full: reconcile every file; incremental: skip dates already stored
    #[arg(long, value_enum)]
    pub mode: Option<ImportModeArg>,

    /// Only files dated within this many days of today
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Import at most this many files, oldest first
    #[arg(long)]
    pub limit: Option<u32>,

    /// Excel sheet name (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Compute outcomes without committing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Args)]
pub struct CheckConsistencyArgs {
    /// Race date, YYYYMMDD
    pub date: String,
}

#[derive(Clone, Debug, Args)]
pub struct QuarantineArgs {
    /// Back up and delete; without this only the plan is printed
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Clone, Debug, Args)]
pub struct AuditArgs {
    /// Race date, YYYYMMDD
    #[arg(long)]
    pub date: Option<String>,

    /// Horse name as printed; matched after normalization
    #[arg(long)]
    pub horse: Option<String>,

    /// Workbook file name that made the change
    #[arg(long)]
    pub file: Option<String>,

    /// Show at most this many entries
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, Args)]
pub struct HeadersArgs {
    /// Workbook files or directories
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Excel sheet name (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Registered schema name, e.g. `import_report`; omit to list them
    pub type_name: Option<String>,
}
