use std::path::{Path, PathBuf};

use anyhow::Context;

/// Walk upwards from `start` until a `.umaji` directory is found.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".umaji").is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// `--project` if given, else the nearest ancestor holding `.umaji`, else
/// the current directory (the store is created on first import).
pub fn resolve_project_root(project_override: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(path) = project_override {
        let explicit = PathBuf::from(path);

        if explicit
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == ".umaji")
        {
            return explicit
                .parent()
                .map(Path::to_path_buf)
                .context("invalid --project path: '.umaji' directory has no parent");
        }

        if explicit.is_dir() {
            return Ok(explicit);
        }

        anyhow::bail!(
            "invalid --project '{}': directory does not exist",
            explicit.display()
        );
    }

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    Ok(find_project_root(&cwd).unwrap_or(cwd))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{find_project_root, resolve_project_root};

    #[test]
    fn finds_project_root_in_current_directory() {
        let temp = TempDir::new().expect("tempdir should create");
        std::fs::create_dir(temp.path().join(".umaji")).expect(".umaji should create");

        let found = find_project_root(temp.path());
        assert_eq!(found.as_deref(), Some(temp.path()));
    }

    #[test]
    fn finds_project_root_in_parent_directory() {
        let temp = TempDir::new().expect("tempdir should create");
        std::fs::create_dir(temp.path().join(".umaji")).expect(".umaji should create");
        std::fs::create_dir_all(temp.path().join("yDate/2025")).expect("nested dirs should create");

        let found = find_project_root(&temp.path().join("yDate/2025"));
        assert_eq!(found.as_deref(), Some(temp.path()));
    }

    #[test]
    fn returns_none_when_not_found() {
        let temp = TempDir::new().expect("tempdir should create");
        std::fs::create_dir_all(temp.path().join("a/b")).expect("nested dirs should create");

        assert!(find_project_root(&temp.path().join("a/b")).is_none());
    }

    #[test]
    fn explicit_umaji_dir_resolves_to_parent() {
        let temp = TempDir::new().expect("tempdir should create");
        let dot = temp.path().join(".umaji");
        std::fs::create_dir(&dot).expect(".umaji should create");

        let root = resolve_project_root(dot.to_str()).expect("root should resolve");
        assert_eq!(root, temp.path());
    }

    #[test]
    fn explicit_missing_dir_is_rejected() {
        let temp = TempDir::new().expect("tempdir should create");
        let missing = temp.path().join("nope");
        assert!(resolve_project_root(missing.to_str()).is_err());
    }
}
