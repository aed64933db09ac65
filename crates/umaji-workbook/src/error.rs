//! Workbook error types.

use thiserror::Error;
use umaji_core::enums::ErrorKind;

/// File-level failures. Either one skips the whole file.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// The file is missing, corrupt, empty, or of an unsupported format.
    #[error("Unreadable workbook {path}: {reason}")]
    UnreadableWorkbook { path: String, reason: String },

    /// No header maps to a required identity field.
    #[error("Unresolvable schema: missing {missing:?} among headers {headers:?}")]
    UnresolvableSchema {
        headers: Vec<String>,
        missing: Vec<String>,
    },
}

impl WorkbookError {
    pub(crate) fn unreadable(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::UnreadableWorkbook {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnreadableWorkbook { .. } => ErrorKind::UnreadableWorkbook,
            Self::UnresolvableSchema { .. } => ErrorKind::UnresolvableSchema,
        }
    }
}
