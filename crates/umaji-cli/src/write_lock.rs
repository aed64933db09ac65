//! Single-writer lock on the mark store.
//!
//! `.umaji/store.write.lock` holds `"<pid> <operation>"` for the process that
//! is importing or quarantining. Readers never take it.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(300);
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Store-mutating commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Import,
    Quarantine,
}

impl WriteOperation {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Quarantine => "quarantine",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "import" => Some(Self::Import),
            "quarantine" => Some(Self::Quarantine),
            _ => None,
        }
    }
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who wrote the lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Holder {
    pid: i32,
    /// `None` for lock files written without an operation.
    operation: Option<WriteOperation>,
}

impl Holder {
    fn parse(contents: &str) -> Option<Self> {
        let mut parts = contents.split_whitespace();
        let pid = parts.next()?.parse().ok()?;
        let operation = parts.next().and_then(WriteOperation::parse);
        Some(Self { pid, operation })
    }

    fn describe(self) -> String {
        match self.operation {
            Some(operation) => format!("{operation} (pid {})", self.pid),
            None => format!("pid {}", self.pid),
        }
    }
}

/// Removes the lock file when dropped, on every exit path.
pub struct WriteLockGuard {
    path: PathBuf,
}

impl Drop for WriteLockGuard {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), %error, "failed to remove write lock");
        }
    }
}

#[must_use]
pub fn lock_path(project_root: &Path) -> PathBuf {
    project_root.join(".umaji").join("store.write.lock")
}

#[derive(Debug, PartialEq, Eq)]
enum LockState {
    Held(Holder),
    /// The holder is gone; its operation may have been cut short.
    Stale(Holder),
    Unreadable,
}

/// Wait for the store's single-writer lock, clearing it if its owner died.
pub async fn acquire_for_project(
    project_root: &Path,
    operation: WriteOperation,
) -> anyhow::Result<WriteLockGuard> {
    let lock_path = lock_path(project_root);
    let started = Instant::now();

    loop {
        let state = match try_acquire(&lock_path, operation) {
            Ok(guard) => {
                tracing::debug!(path = %lock_path.display(), %operation, "write lock acquired");
                return Ok(guard);
            }
            Err(state) => state,
        };

        if let LockState::Stale(holder) = state {
            tracing::warn!(
                holder = %holder.describe(),
                "previous writer exited without releasing the store lock; clearing it"
            );
            if let Err(error) = std::fs::remove_file(&lock_path) {
                tracing::debug!(%error, "stale lock already gone");
            }
            continue;
        }

        if started.elapsed() >= LOCK_WAIT_TIMEOUT {
            match state {
                LockState::Held(holder) => anyhow::bail!(
                    "store is locked by a running {}; try again after it finishes",
                    holder.describe()
                ),
                _ => anyhow::bail!(
                    "could not read write lock at {}; remove it if no umaji process is running",
                    lock_path.display()
                ),
            }
        }
        if let LockState::Held(holder) = state {
            tracing::debug!(holder = %holder.describe(), "store locked; waiting");
        }
        tokio::time::sleep(LOCK_RETRY_DELAY).await;
    }
}

fn try_acquire(lock_path: &Path, operation: WriteOperation) -> Result<WriteLockGuard, LockState> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent).map_err(|_| LockState::Unreadable)?;
    }

    match OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(lock_path)
    {
        Ok(mut file) => {
            let guard = WriteLockGuard {
                path: lock_path.to_path_buf(),
            };
            if let Err(error) = writeln!(file, "{} {operation}", std::process::id()) {
                tracing::warn!(%error, "write lock created without holder details");
            }
            Ok(guard)
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            let contents = std::fs::read_to_string(lock_path).map_err(|_| LockState::Unreadable)?;
            match Holder::parse(&contents) {
                Some(holder) if is_process_running(holder.pid) => Err(LockState::Held(holder)),
                Some(holder) => Err(LockState::Stale(holder)),
                None => Err(LockState::Unreadable),
            }
        }
        Err(_) => Err(LockState::Unreadable),
    }
}

fn is_process_running(pid: i32) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .status()
        .is_ok_and(|status| status.success())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lock_records_pid_and_operation() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let path = lock_path(temp.path());

        let guard = try_acquire(&path, WriteOperation::Quarantine).expect("lock should acquire");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            Holder::parse(&contents),
            Some(Holder {
                pid: i32::try_from(std::process::id()).unwrap(),
                operation: Some(WriteOperation::Quarantine),
            })
        );
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn running_import_blocks_quarantine() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let path = lock_path(temp.path());

        let _guard = try_acquire(&path, WriteOperation::Import).expect("lock should acquire");
        match try_acquire(&path, WriteOperation::Quarantine) {
            Err(LockState::Held(holder)) => {
                assert_eq!(holder.operation, Some(WriteOperation::Import));
                assert!(holder.describe().starts_with("import (pid "));
            }
            other => panic!("expected held lock, got {:?}", other.err()),
        }
    }

    #[test]
    fn bare_pid_lock_is_still_understood() {
        assert_eq!(
            Holder::parse("4242\n"),
            Some(Holder {
                pid: 4242,
                operation: None,
            })
        );
        assert_eq!(Holder::parse("4242\n").unwrap().describe(), "pid 4242");
    }

    #[test]
    fn garbage_lock_contents_are_unreadable() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let path = lock_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not-a-pid").unwrap();

        assert_eq!(
            try_acquire(&path, WriteOperation::Import).err(),
            Some(LockState::Unreadable)
        );
    }

    #[tokio::test]
    async fn dead_holder_is_cleared() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let path = lock_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("{} import\n", i32::MAX)).unwrap();

        let guard = acquire_for_project(temp.path(), WriteOperation::Import)
            .await
            .expect("stale lock should be replaced");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with(" import\n"));
        drop(guard);
    }
}
