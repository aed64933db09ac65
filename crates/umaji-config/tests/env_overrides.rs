use figment::Jail;
use umaji_config::{ConfigError, UmajiConfig};
use umaji_core::enums::ImportMode;

#[test]
fn env_overrides_nested_sections() {
    Jail::expect_with(|jail| {
        jail.set_env("UMAJI_STORE__PATH", "/tmp/env-marks.db");
        jail.set_env("UMAJI_IMPORT__MODE", "incremental");
        jail.set_env("UMAJI_ANOMALY__MAX_YEAR", "2040");
        jail.set_env("UMAJI_STORE__BUSY_TIMEOUT_MS", "250");

        let config = UmajiConfig::load().expect("config loads");
        assert_eq!(config.store.path, "/tmp/env-marks.db");
        assert_eq!(config.store.busy_timeout_ms, 250);
        assert_eq!(config.import.mode, ImportMode::Incremental);
        assert_eq!(config.anomaly.max_year, 2040);
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".umaji")?;
        jail.create_file(
            ".umaji/config.toml",
            r#"
[master]
path = "from-file.db"
"#,
        )?;
        jail.set_env("UMAJI_MASTER__PATH", "from-env.db");

        let config = UmajiConfig::load().expect("config loads");
        assert_eq!(config.master.path, "from-env.db");
        Ok(())
    });
}

#[test]
fn env_with_inverted_years_fails_validation() {
    Jail::expect_with(|jail| {
        jail.set_env("UMAJI_ANOMALY__MIN_YEAR", "2050");
        jail.set_env("UMAJI_ANOMALY__MAX_YEAR", "2000");

        let result = UmajiConfig::load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        Ok(())
    });
}
