//! Database error types for umaji-db.

use thiserror::Error;
use umaji_core::enums::ErrorKind;

/// Errors from store and master-feed operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A date argument failed the date-domain check.
    #[error("Invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    /// The master-data feed could not be opened or read.
    #[error("Master feed unavailable: {0}")]
    MasterUnavailable(String),

    /// A write transaction could not be started; the store is locked by
    /// another writer or unreachable. Fatal for the whole run.
    #[error("Store transaction unavailable: {0}")]
    TransactionUnavailable(String),

    /// A file's transaction could not be committed; nothing from it was kept.
    #[error("Store write failed: {0}")]
    StoreWriteFailure(String),

    /// The pre-delete backup could not be written or verified; nothing was deleted.
    #[error("Quarantine backup failed: {0}")]
    QuarantineBackupFailure(String),

    /// Quarantine execution was requested without confirmation.
    #[error("Quarantine not confirmed; re-run with --confirm to back up and delete")]
    QuarantineNotConfirmed,

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    /// Report category for this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::QuarantineBackupFailure(_) => ErrorKind::QuarantineBackupFailure,
            _ => ErrorKind::StoreWriteFailure,
        }
    }

    /// Whether this failure must stop a batch rather than fail one file.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::TransactionUnavailable(_))
    }
}
