//! # umaji-db
//!
//! libSQL storage for umaji.
//!
//! Holds the `horse_marks` target store and its `mark_audit` diff log, the
//! Reconciliation/Upsert Engine, the Anomaly Detector & Quarantine, and the
//! read-only master-feed reader used by the Cross-Store Consistency Checker.
//!
//! Uses the `libsql` crate (C `SQLite` fork, v0.9.29) in local-only mode.

pub mod consistency;
pub mod error;
pub mod helpers;
pub mod master;
mod migrations;
pub mod repos;
pub mod service;

use std::time::Duration;

use error::DatabaseError;
use libsql::Builder;

/// How long a writer waits on another connection's lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database handle for the mark store.
pub struct UmajiDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl UmajiDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// File stores are switched to WAL so readers can keep a snapshot open
    /// while an import commits. Runs migrations automatically on every open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;

        let umaji_db = Self { db, conn };
        if path != ":memory:" {
            umaji_db.enable_wal().await?;
        }
        umaji_db.run_migrations().await?;
        Ok(umaji_db)
    }

    /// Replace the lock wait applied to every statement on this connection.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if libSQL rejects the timeout.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<(), DatabaseError> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    async fn enable_wal(&self) -> Result<(), DatabaseError> {
        let mut rows = self.conn.query("PRAGMA journal_mode = WAL", ()).await?;
        let mode = match rows.next().await? {
            Some(row) => row.get::<String>(0)?,
            None => String::new(),
        };
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!(journal_mode = %mode, "WAL mode not active");
        }
        Ok(())
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}
