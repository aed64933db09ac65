//! Service layer over the mark store.
//!
//! `MarkService` wraps `UmajiDb`. Repository methods live in `repos/` as
//! `impl MarkService` blocks.

use std::path::Path;

use crate::UmajiDb;
use crate::error::DatabaseError;

/// Owns the store connection; every store operation is a method on it.
pub struct MarkService {
    db: UmajiDb,
}

impl MarkService {
    /// Open (creating if needed) the store at `db_path`, or `":memory:"`.
    ///
    /// The parent directory is created for file-backed stores.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory or database cannot be
    /// created or migrations fail.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        DatabaseError::InvalidState(format!(
                            "cannot create store directory {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
        }
        let db = UmajiDb::open_local(db_path).await?;
        tracing::debug!(path = db_path, "mark store opened");
        Ok(Self { db })
    }

    /// Create from an existing `UmajiDb` (for testing).
    #[must_use]
    pub const fn from_db(db: UmajiDb) -> Self {
        Self { db }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &UmajiDb {
        &self.db
    }
}
