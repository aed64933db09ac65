//! Import defaults. Command-line flags override these per run.

use serde::{Deserialize, Serialize};
use umaji_core::enums::ImportMode;

fn default_workbook_dir() -> String {
    "yDate".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    /// Directory scanned when `umaji import` is given no paths.
    #[serde(default = "default_workbook_dir")]
    pub workbook_dir: String,

    /// Sheet to read; empty means the first sheet.
    #[serde(default)]
    pub sheet: String,

    #[serde(default)]
    pub mode: ImportMode,

    /// Only import files dated within this many days of today. 0 = no limit.
    #[serde(default)]
    pub lookback_days: u32,

    /// Import at most this many files (after chronological ordering). 0 = no limit.
    #[serde(default)]
    pub limit: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            workbook_dir: default_workbook_dir(),
            sheet: String::new(),
            mode: ImportMode::Full,
            lookback_days: 0,
            limit: 0,
        }
    }
}

impl ImportConfig {
    pub fn sheet(&self) -> Option<&str> {
        if self.sheet.is_empty() {
            None
        } else {
            Some(&self.sheet)
        }
    }
}
