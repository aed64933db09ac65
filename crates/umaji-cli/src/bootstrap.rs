use std::path::Path;

use anyhow::Context;
use umaji_config::UmajiConfig;

/// Load `<project>/.env` (or the nearest `.env`), then the layered config.
pub fn load_config(project_root: &Path) -> anyhow::Result<UmajiConfig> {
    load_project_dotenv(project_root)?;
    UmajiConfig::load_for_project(project_root).context("failed to load umaji configuration")
}

fn load_project_dotenv(project_root: &Path) -> anyhow::Result<()> {
    let env_path = project_root.join(".env");
    if env_path.exists() {
        dotenvy::from_path(&env_path)
            .with_context(|| format!("failed to load dotenv file at {}", env_path.display()))?;
        return Ok(());
    }

    dotenvy::dotenv().ok();
    Ok(())
}
