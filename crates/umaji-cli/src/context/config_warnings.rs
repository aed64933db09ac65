const SECTIONS: [(&str, &str); 4] = [
    ("STORE", "UMAJI_STORE__PATH"),
    ("MASTER", "UMAJI_MASTER__PATH"),
    ("IMPORT", "UMAJI_IMPORT__WORKBOOK_DIR"),
    ("ANOMALY", "UMAJI_ANOMALY__MIN_YEAR"),
];

/// Emit warnings for env var keys that figment ignores because they use a
/// single underscore between section and field.
pub fn warn_mistyped_env() {
    for warning in collect_env_warnings(std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_env_warnings<I>(env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();

    SECTIONS
        .iter()
        .filter_map(|(section, example)| {
            let prefix = format!("UMAJI_{section}_");
            let nested = format!("UMAJI_{section}__");
            env_keys
                .iter()
                .find(|key| key.starts_with(&prefix) && !key.starts_with(&nested))
                .map(|key| {
                    format!(
                        "{key} is ignored: use double underscores between section and field (example: {example})."
                    )
                })
        })
        .collect()
}
