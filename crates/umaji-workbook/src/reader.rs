//! Workbook Reader.
//!
//! Reads one sheet of an Excel workbook (calamine) or a CSV export into text
//! cells. Nothing is ever returned as a number: venue codes like `"06"` and
//! 16-digit race ids must survive untouched.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate};

use crate::error::WorkbookError;

/// Tabular formats the reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    Excel,
    Csv,
}

impl WorkbookFormat {
    /// Detect by extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" => Some(Self::Excel),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Whether a directory scan should hand this path to the reader.
///
/// Excel lock files (`~$20250928.xlsx`) are not workbooks.
#[must_use]
pub fn is_supported(path: &Path) -> bool {
    let is_lock_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"));
    !is_lock_file && WorkbookFormat::from_path(path).is_some()
}

/// One sheet as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: Option<String>,
    /// Trimmed header cells, in column order.
    pub headers: Vec<String>,
    /// Data rows padded to `headers.len()`, cells untrimmed. Entirely blank
    /// rows are dropped.
    pub rows: Vec<SheetRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    /// 1-based line in the source (the header is line 1).
    pub line: usize,
    pub cells: Vec<String>,
}

impl Sheet {
    /// Header → value pairs for one row, in column order.
    #[must_use]
    pub fn record(&self, index: usize) -> Vec<(&str, &str)> {
        let Some(row) = self.rows.get(index) else {
            return Vec::new();
        };
        self.headers
            .iter()
            .map(String::as_str)
            .zip(row.cells.iter().map(String::as_str))
            .collect()
    }

    fn from_grid(
        name: Option<String>,
        grid: Vec<Vec<String>>,
        path: &Path,
    ) -> Result<Self, WorkbookError> {
        let mut lines = grid.into_iter().enumerate();
        let headers: Vec<String> = loop {
            match lines.next() {
                Some((_, cells)) if cells.iter().all(|c| c.trim().is_empty()) => {}
                Some((_, cells)) => break cells.iter().map(|c| c.trim().to_string()).collect(),
                None => return Err(WorkbookError::unreadable(path, "no header row")),
            }
        };

        let width = headers.len();
        let rows = lines
            .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
            .map(|(idx, mut cells)| {
                cells.resize(width.max(cells.len()), String::new());
                SheetRow {
                    line: idx + 1,
                    cells,
                }
            })
            .collect();

        Ok(Self {
            name,
            headers,
            rows,
        })
    }
}

/// Read one sheet from `path`.
///
/// `sheet` selects an Excel sheet by name; `None` reads the first sheet. CSV
/// files ignore the selector.
///
/// # Errors
///
/// Returns `WorkbookError::UnreadableWorkbook` when the file is absent,
/// corrupt, has no header row, lacks the selected sheet, or has an
/// unsupported extension.
pub fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Sheet, WorkbookError> {
    if !path.is_file() {
        return Err(WorkbookError::unreadable(path, "file not found"));
    }
    match WorkbookFormat::from_path(path) {
        Some(WorkbookFormat::Excel) => read_excel(path, sheet),
        Some(WorkbookFormat::Csv) => read_csv(path),
        None => Err(WorkbookError::unreadable(path, "unsupported extension")),
    }
}

fn read_excel(path: &Path, sheet: Option<&str>) -> Result<Sheet, WorkbookError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| WorkbookError::unreadable(path, e))?;

    let sheet_names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| WorkbookError::unreadable(path, format!("no sheet named '{wanted}'")))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| WorkbookError::unreadable(path, "workbook has no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| WorkbookError::unreadable(path, e))?;

    let grid: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    tracing::debug!(file = %path.display(), sheet = %name, "read excel sheet");
    Sheet::from_grid(Some(name), grid, path)
}

fn read_csv(path: &Path) -> Result<Sheet, WorkbookError> {
    let bytes = std::fs::read(path).map_err(|e| WorkbookError::unreadable(path, e))?;
    let text = decode_text(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut grid: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| WorkbookError::unreadable(path, e))?;
        grid.push(record.iter().map(str::to_string).collect());
    }

    tracing::debug!(file = %path.display(), rows = grid.len(), "read csv");
    Sheet::from_grid(None, grid, path)
}

/// UTF-8 (BOM stripped) when valid, otherwise Shift_JIS.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
            if had_errors {
                tracing::warn!("csv is neither UTF-8 nor clean Shift_JIS; undecodable bytes replaced");
            }
            text.into_owned()
        }
    }
}

/// Render one Excel cell as text.
pub(crate) fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            serial_date_text(dt.as_f64()).unwrap_or_else(|| float_text(dt.as_f64()))
        }
        other => other.to_string().trim().to_string(),
    }
}

/// Integral floats print without a fractional part: `6.0` → `"6"`.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn float_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Excel serial day number → `YYYYMMDD`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn serial_date_text(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(serial.floor() as i64))?;
    Some(date.format("%Y%m%d").to_string())
}
