//! External master-data feed configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MasterConfig {
    /// SQLite/libSQL file with `N_RACE` and `N_UMA_RACE`. Opened read-only.
    #[serde(default)]
    pub path: String,

    /// Resolve venue/race for rows lacking them by looking the horse up in
    /// the master feed.
    #[serde(default)]
    pub resolve_identity: bool,
}

impl MasterConfig {
    pub fn is_configured(&self) -> bool {
        !self.path.is_empty()
    }
}
