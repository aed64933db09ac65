//! # umaji-config
//!
//! Layered configuration loading for umaji using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`UMAJI_*` prefix, `__` as separator)
//! 2. Project-level `.umaji/config.toml`
//! 3. User-level `~/.config/umaji/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `UMAJI_STORE__PATH` -> `store.path`, `UMAJI_MASTER__PATH` -> `master.path`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use umaji_config::UmajiConfig;
//!
//! let config = UmajiConfig::load_with_dotenv().expect("config");
//!
//! if config.master.is_configured() {
//!     println!("Master feed: {}", config.master.path);
//! }
//! ```

mod anomaly;
mod error;
mod import;
mod master;
mod store;

pub use anomaly::AnomalyConfig;
pub use error::ConfigError;
pub use import::ImportConfig;
pub use master::MasterConfig;
pub use store::StoreConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UmajiConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub master: MasterConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
}

impl UmajiConfig {
    /// Load configuration from all sources, resolving the project file
    /// relative to the current directory.
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_for_project(Path::new("."))
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load configuration using `<project_root>/.umaji/config.toml` as the
    /// project layer.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load_for_project(project_root: &Path) -> Result<Self, ConfigError> {
        let config: Self = Self::figment_for(project_root).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain for the current directory.
    pub fn figment() -> Figment {
        Self::figment_for(Path::new("."))
    }

    /// Build the figment provider chain for a project root.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    pub fn figment_for(project_root: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = project_root.join(".umaji").join("config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("UMAJI_").split("__"))
    }

    /// Reject combinations figment cannot catch by type alone.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.anomaly.min_year > self.anomaly.max_year {
            return Err(ConfigError::InvalidValue {
                field: "anomaly.min_year".into(),
                reason: format!(
                    "{} is after anomaly.max_year {}",
                    self.anomaly.min_year, self.anomaly.max_year
                ),
            });
        }
        if self.store.path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.path".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// The master feed path, or `NotConfigured` when unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotConfigured` if `master.path` is empty.
    pub fn require_master(&self) -> Result<&str, ConfigError> {
        if self.master.is_configured() {
            Ok(&self.master.path)
        } else {
            Err(ConfigError::NotConfigured {
                section: "master".into(),
            })
        }
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("umaji").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = UmajiConfig::default();
        assert!(!config.master.is_configured());
        assert_eq!(config.store.path, ".umaji/marks.db");
        assert_eq!(config.import.workbook_dir, "yDate");
        assert_eq!(config.anomaly.min_year, 1986);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_year_bounds_are_rejected() {
        let mut config = UmajiConfig::default();
        config.anomaly.min_year = 2030;
        config.anomaly.max_year = 2020;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "anomaly.min_year"
        ));
    }

    #[test]
    fn require_master_reports_section() {
        let config = UmajiConfig::default();
        assert!(matches!(
            config.require_master(),
            Err(ConfigError::NotConfigured { ref section }) if section == "master"
        ));
    }
}
