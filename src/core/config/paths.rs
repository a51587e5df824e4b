use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let data_dir = discover_data_dir(&project_root);
        Self::with_root(project_root, data_dir)
    }

    /// Builds paths from explicit locations; used by tests and embedders.
    pub fn with_root(project_root: PathBuf, data_dir: PathBuf) -> Self {
        let log_dir = data_dir.join("logs");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            data_dir,
            log_dir,
        }
    }

    /// Resolves a configured file path.
    ///
    /// Absolute paths are returned unchanged. Relative paths are tried against
    /// the data directory first, then the project root; when neither exists
    /// the data-directory candidate is returned so error messages point there.
    pub fn resolve(&self, raw: &Path) -> PathBuf {
        if raw.is_absolute() {
            return raw.to_path_buf();
        }
        let data_candidate = self.data_dir.join(raw);
        if data_candidate.exists() {
            return data_candidate;
        }
        let project_candidate = self.project_root.join(raw);
        if project_candidate.exists() {
            return project_candidate;
        }
        data_candidate
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("LAWBOT_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("LAWBOT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    project_root.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_data_dir_then_project_root() {
        let root = tempfile::tempdir().expect("tempdir");
        let data = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::with_root(root.path().to_path_buf(), data.path().to_path_buf());

        fs::create_dir_all(root.path().join("data")).expect("mkdir");
        fs::write(root.path().join("data/meta.json"), "[]").expect("write");
        assert_eq!(
            paths.resolve(Path::new("data/meta.json")),
            root.path().join("data/meta.json")
        );

        fs::create_dir_all(data.path().join("data")).expect("mkdir");
        fs::write(data.path().join("data/meta.json"), "[]").expect("write");
        assert_eq!(
            paths.resolve(Path::new("data/meta.json")),
            data.path().join("data/meta.json")
        );
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let data = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::with_root(data.path().to_path_buf(), data.path().to_path_buf());
        let absolute = data.path().join("elsewhere/index.bin");
        assert_eq!(paths.resolve(&absolute), absolute);
    }

    #[test]
    fn with_root_creates_log_dir() {
        let data = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::with_root(data.path().to_path_buf(), data.path().join("state"));
        assert!(paths.log_dir.is_dir());
    }
}
