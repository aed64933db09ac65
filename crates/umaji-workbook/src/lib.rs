//! # umaji-workbook
//!
//! Workbook ingestion for umaji: the reader turns `.xlsx`/`.xls`/`.csv` files
//! into rows of text cells, and the mapper projects those rows onto the
//! canonical field set whatever header version the file uses.

pub mod error;
pub mod mapper;
pub mod reader;

use std::path::Path;

use umaji_core::responses::HeaderSurvey;

pub use error::WorkbookError;
pub use mapper::{ColumnMapping, HEADER_VERSIONS, HeaderVersion, header_key, map_headers};
pub use reader::{Sheet, SheetRow, WorkbookFormat, is_supported, read_workbook};

/// Read one file's headers and report how they map, without touching rows.
///
/// Never fails: read and mapping errors are reported in `error`.
#[must_use]
pub fn survey(path: &Path, sheet: Option<&str>) -> HeaderSurvey {
    let mut report = HeaderSurvey {
        file: path.display().to_string(),
        ..HeaderSurvey::default()
    };

    let sheet = match read_workbook(path, sheet) {
        Ok(sheet) => sheet,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };
    report.headers.clone_from(&sheet.headers);

    match map_headers(&sheet.headers) {
        Ok(mapping) => {
            report.header_version = Some(mapping.version.to_string());
            report.mapped = mapping.describe();
            report.unmapped = mapping.unmapped_headers();
            report.warnings = mapping.warnings;
        }
        Err(e) => report.error = Some(e.to_string()),
    }
    report
}
