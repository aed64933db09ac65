//! Terminal progress for `umaji import` and `umaji quarantine --confirm`.
//!
//! Draws nothing when `ui::prefs().progress` is off (quiet, non-tty, or a
//! machine-readable format), but file tallies are kept either way.

use std::sync::atomic::{AtomicU32, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use umaji_core::enums::FileStatus;

use crate::ui;

/// Per-file outcomes seen so far in one batch.
#[derive(Debug, Default)]
struct Tally {
    done: AtomicU32,
    skipped: AtomicU32,
    failed: AtomicU32,
}

impl Tally {
    fn record(&self, status: FileStatus) {
        let counter = match status {
            FileStatus::Committed | FileStatus::DryRun => &self.done,
            FileStatus::SkippedIncremental => &self.skipped,
            FileStatus::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> (u32, u32, u32) {
        (
            self.done.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

/// `"3 done, 1 skipped, 2 failed"`; zero counts other than `done` are left out.
fn tally_text(done: u32, skipped: u32, failed: u32) -> String {
    let mut parts = vec![format!("{done} done")];
    if skipped > 0 {
        parts.push(format!("{skipped} skipped"));
    }
    if failed > 0 {
        parts.push(format!("{failed} failed"));
    }
    parts.join(", ")
}

fn bar_template(term_width: Option<usize>) -> &'static str {
    match term_width {
        Some(cols) if cols >= 110 => "{bar:40.cyan/blue} {pos}/{len} {msg}",
        Some(cols) if cols >= 80 => "{wide_bar:.cyan/blue} {pos}/{len} {msg}",
        _ => "{wide_bar:.cyan/blue} {percent}% {msg}",
    }
}

pub struct Progress {
    bar: Option<ProgressBar>,
    tally: Tally,
}

impl Progress {
    /// A bar over `total` workbooks.
    #[must_use]
    pub fn files(total: usize) -> Self {
        let prefs = ui::prefs();
        let bar = prefs.progress.then(|| {
            let bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
            bar.set_style(
                ProgressStyle::with_template(bar_template(prefs.term_width))
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        });
        Self {
            bar,
            tally: Tally::default(),
        }
    }

    /// A spinner for a single long store operation.
    #[must_use]
    pub fn spinner(message: &str) -> Self {
        let bar = ui::prefs().progress.then(|| {
            let bar = ProgressBar::new_spinner();
            bar.enable_steady_tick(std::time::Duration::from_millis(100));
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.set_message(message.to_string());
            bar
        });
        Self {
            bar,
            tally: Tally::default(),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: None,
            tally: Tally::default(),
        }
    }

    pub fn start_file(&self, name: &str) {
        if let Some(bar) = &self.bar {
            let (done, skipped, failed) = self.tally.snapshot();
            bar.set_message(format!("{name} ({})", tally_text(done, skipped, failed)));
        }
    }

    pub fn file_done(&self, status: FileStatus) {
        self.tally.record(status);
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Clear the bar after a clean batch; leave the tally on screen otherwise.
    pub fn finish_batch(&self) {
        let (done, skipped, failed) = self.tally.snapshot();
        if let Some(bar) = &self.bar {
            if failed == 0 {
                bar.finish_and_clear();
            } else {
                bar.abandon_with_message(tally_text(done, skipped, failed));
            }
        }
    }

    pub fn finish_ok(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }

    pub fn finish_err(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.abandon_with_message(message.to_string());
        }
    }

    #[cfg(test)]
    fn counts(&self) -> (u32, u32, u32) {
        self.tally.snapshot()
    }
}
