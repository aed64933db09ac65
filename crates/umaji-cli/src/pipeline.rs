//! Import pipeline: discover → order → read → map → normalize → reconcile.
//!
//! Files are processed one at a time in chronological order of the date in
//! their name. Each file either commits as one transaction or is recorded as
//! failed; a failed file never stops the batch. A store that refuses to start
//! a write transaction does, since no later file could commit either.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use umaji_core::enums::{FileStatus, ImportMode};
use umaji_core::identity::{
    FieldWarning, FileContext, IdentityNormalizer, MasterSnapshot, RaceLocator,
};
use umaji_core::normalize;
use umaji_core::responses::{EMPTY_ROW_REASON, ImportFileSummary, ImportReport};
use umaji_db::error::DatabaseError;
use umaji_db::master::MasterFeed;
use umaji_db::service::MarkService;
use umaji_workbook::{is_supported, map_headers, read_workbook};

use crate::progress::Progress;

/// One candidate workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookFile {
    pub path: PathBuf,
    pub name: String,
    /// `YYYYMMDD` from the file name.
    pub date: Option<String>,
}

impl WorkbookFile {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let date = normalize::date_from_file_name(&name);
        Self { path, name, date }
    }
}

/// Per-run knobs, already merged from flags and config.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub mode: ImportMode,
    /// 0 = no limit.
    pub lookback_days: u32,
    /// 0 = no limit.
    pub limit: u32,
    pub sheet: Option<String>,
    pub dry_run: bool,
    pub today: NaiveDate,
}

/// Expand inputs into workbook files. Directories are scanned one level deep;
/// explicit file paths are kept even when missing so the failure is reported.
pub fn discover(inputs: &[PathBuf]) -> anyhow::Result<Vec<WorkbookFile>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input)
                .with_context(|| format!("failed to list {}", input.display()))?;
            for entry in entries {
                let path = entry
                    .with_context(|| format!("failed to list {}", input.display()))?
                    .path();
                if path.is_file() && is_supported(&path) {
                    files.push(WorkbookFile::new(path));
                } else {
                    tracing::debug!(path = %path.display(), "not a workbook; skipped");
                }
            }
        } else {
            files.push(WorkbookFile::new(input.clone()));
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);
    Ok(files)
}

/// Chronological order (undated files last, by name), then lookback and limit.
#[must_use]
pub fn select(mut files: Vec<WorkbookFile>, options: &ImportOptions) -> Vec<WorkbookFile> {
    files.sort_by(|a, b| {
        (a.date.is_none(), &a.date, &a.name).cmp(&(b.date.is_none(), &b.date, &b.name))
    });

    if options.lookback_days > 0 {
        let window = i64::from(options.lookback_days);
        files.retain(|file| {
            let within = file
                .date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok())
                .is_some_and(|d| (options.today - d).num_days() <= window);
            if !within {
                tracing::debug!(file = %file.name, "outside lookback window; skipped");
            }
            within
        });
    }

    if options.limit > 0 {
        files.truncate(usize::try_from(options.limit).unwrap_or(usize::MAX));
    }
    files
}

/// Runs one import batch against a store.
pub struct ImportPipeline<'a> {
    service: &'a MarkService,
    normalizer: IdentityNormalizer,
    master: Option<&'a MasterFeed>,
}

impl<'a> ImportPipeline<'a> {
    #[must_use]
    pub const fn new(service: &'a MarkService, normalizer: IdentityNormalizer) -> Self {
        Self {
            service,
            normalizer,
            master: None,
        }
    }

    /// Resolve venue and race for rows lacking them through the master feed.
    #[must_use]
    pub const fn with_master(mut self, master: &'a MasterFeed) -> Self {
        self.master = Some(master);
        self
    }

    /// Import `files` in the given order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::TransactionUnavailable` when the store cannot
    /// start a write transaction; remaining files are not attempted.
    pub async fn run(
        &self,
        files: &[WorkbookFile],
        options: &ImportOptions,
        progress: &Progress,
    ) -> Result<ImportReport, DatabaseError> {
        let mut summaries = Vec::with_capacity(files.len());
        for file in files {
            progress.start_file(&file.name);
            let summary = self.import_file(file, options).await?;
            match summary.status {
                FileStatus::Failed => tracing::warn!(
                    file = %file.name,
                    error = summary.failure.as_ref().map_or("", |f| f.message.as_str()),
                    "file failed"
                ),
                status => tracing::info!(file = %file.name, status = status.as_str(), "file done"),
            }
            progress.file_done(summary.status);
            summaries.push(summary);
        }
        Ok(ImportReport::from_files(options.mode, options.dry_run, summaries))
    }

    async fn import_file(
        &self,
        file: &WorkbookFile,
        options: &ImportOptions,
    ) -> Result<ImportFileSummary, DatabaseError> {
        let mut summary = ImportFileSummary::new(&file.name, file.date.clone());

        if options.mode == ImportMode::Incremental {
            if let Some(date) = &file.date {
                match self.service.has_rows_for_date(date).await {
                    Ok(true) => {
                        summary.status = FileStatus::SkippedIncremental;
                        return Ok(summary);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        summary.fail(e.kind(), e.to_string());
                        return Ok(summary);
                    }
                }
            }
        }

        let sheet = match read_workbook(&file.path, options.sheet.as_deref()) {
            Ok(sheet) => sheet,
            Err(e) => {
                summary.fail(e.kind(), e.to_string());
                return Ok(summary);
            }
        };

        let mapping = match map_headers(&sheet.headers) {
            Ok(mapping) => mapping,
            Err(e) => {
                tracing::warn!(file = %file.name, headers = ?sheet.headers, "no identity columns");
                summary.fail(e.kind(), e.to_string());
                return Ok(summary);
            }
        };
        summary.header_version = Some(mapping.version.to_string());
        summary
            .field_warnings
            .extend(mapping.warnings.iter().map(|warning| FieldWarning {
                line: 1,
                field: "header".to_string(),
                value: String::new(),
                reason: warning.clone(),
            }));

        let context = FileContext::from_file_name(&file.name);
        let snapshot = self.snapshot_for(file).await;
        let locator = snapshot.as_ref().map(|s| s as &dyn RaceLocator);

        let mut rows = Vec::with_capacity(sheet.rows.len());
        for sheet_row in &sheet.rows {
            let canonical = mapping.map_row(sheet_row);
            if !canonical.has_payload() {
                summary.skip_row(canonical.line, EMPTY_ROW_REASON);
                continue;
            }
            match self.normalizer.normalize(&canonical, &context, locator) {
                Ok(mut row) => {
                    if row.resolved_via_master {
                        summary.resolved_via_master += 1;
                    }
                    summary.field_warnings.append(&mut row.warnings);
                    rows.push(row);
                }
                Err(e) => {
                    tracing::debug!(file = %file.name, line = canonical.line, error = %e, "row skipped");
                    summary.skip_row(canonical.line, e.to_string());
                }
            }
        }

        match self
            .service
            .reconcile_file(&file.name, rows, options.dry_run)
            .await
        {
            Ok(upsert) => {
                summary.absorb(upsert);
                if options.dry_run {
                    summary.status = FileStatus::DryRun;
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => summary.fail(e.kind(), e.to_string()),
        }
        Ok(summary)
    }

    /// Master runners for the file's date, when identity assist is on.
    async fn snapshot_for(&self, file: &WorkbookFile) -> Option<MasterSnapshot> {
        let master = self.master?;
        let date = file.date.clone()?;
        match master.snapshot(&[date]).await {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                tracing::warn!(file = %file.name, %error, "master lookup failed; continuing without it");
                None
            }
        }
    }
}
