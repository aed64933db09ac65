//! Target store configuration.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    ".umaji/marks.db".to_string()
}

fn default_backup_dir() -> String {
    ".umaji/backups".to_string()
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// libSQL database file holding `horse_marks`.
    #[serde(default = "default_path")]
    pub path: String,

    /// Directory receiving full-store copies before quarantine deletes.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Milliseconds a write waits on another connection's lock before the
    /// run is aborted.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            backup_dir: default_backup_dir(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_live_under_project_dir() {
        let config = StoreConfig::default();
        assert_eq!(config.path, ".umaji/marks.db");
        assert_eq!(config.backup_dir, ".umaji/backups");
        assert_eq!(config.busy_timeout_ms, 5_000);
    }
}
