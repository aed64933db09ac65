use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use umaji_config::UmajiConfig;
use umaji_core::date_domain::DateDomain;
use umaji_db::master::MasterFeed;
use umaji_db::service::MarkService;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: MarkService,
    pub config: UmajiConfig,
    pub project_root: PathBuf,
}

impl AppContext {
    /// Open the mark store named by `store.path`, relative to the project root.
    pub async fn init(project_root: PathBuf, config: UmajiConfig) -> anyhow::Result<Self> {
        let store_path = resolve_under(&project_root, &config.store.path);
        let store_path_str = store_path.to_string_lossy();

        let service = MarkService::new_local(&store_path_str)
            .await
            .with_context(|| format!("failed to open mark store at {store_path_str}"))?;
        service
            .db()
            .set_busy_timeout(Duration::from_millis(config.store.busy_timeout_ms))
            .context("failed to set store busy timeout")?;

        Ok(Self {
            service,
            config,
            project_root,
        })
    }

    #[must_use]
    pub const fn date_domain(&self) -> DateDomain {
        self.config.anomaly.date_domain()
    }

    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        resolve_under(&self.project_root, &self.config.store.backup_dir)
    }

    /// Directory scanned when `umaji import` gets no paths.
    #[must_use]
    pub fn workbook_dir(&self) -> PathBuf {
        resolve_under(&self.project_root, &self.config.import.workbook_dir)
    }

    /// Open the configured master feed.
    pub async fn open_master(&self) -> anyhow::Result<MasterFeed> {
        let path = self
            .config
            .require_master()
            .context("set master.path (or UMAJI_MASTER__PATH) to the master-data feed")?;
        let path = resolve_under(&self.project_root, path);
        Ok(MasterFeed::open(&path).await?)
    }
}

/// Relative config paths are anchored at the project root.
#[must_use]
pub fn resolve_under(project_root: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() || configured == ":memory:" {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
use std::time::Duration;

    use umaji_config::UmajiConfig;

    use super::{AppContext, resolve_under};

    #[test]
    fn relative_paths_join_project_root() {
        assert_eq!(
            resolve_under(Path::new("/srv/keiba"), ".umaji/marks.db"),
            PathBuf::from("/srv/keiba/.umaji/marks.db")
        );
        assert_eq!(
            resolve_under(Path::new("/srv/keiba"), "/data/master.db"),
            PathBuf::from("/data/master.db")
        );
        assert_eq!(
            resolve_under(Path::new("/srv/keiba"), ":memory:"),
            PathBuf::from(":memory:")
        );
    }

    #[tokio::test]
    async fn init_creates_store_under_project() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let ctx = AppContext::init(temp.path().to_path_buf(), UmajiConfig::default())
            .await
            .expect("context should init");

        assert!(temp.path().join(".umaji/marks.db").is_file());
        assert_eq!(ctx.backup_dir(), temp.path().join(".umaji/backups"));
        assert_eq!(ctx.service.count_marks().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unconfigured_master_is_an_error() {
        let mut config = UmajiConfig::default();
        config.store.path = ":memory:".to_string();
        let ctx = AppContext::init(PathBuf::from("."), config)
            .await
            .expect("context should init");

        let error = ctx.open_master().await.err().expect("master should be missing");
        assert!(format!("{error:#}").contains("master.path"));
    }
}
