//! `assetflow init`: write a starter configuration.

use crate::config::CONFIG_FILE_NAME;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error during project initialization
#[derive(Debug, Error)]
pub enum InitError {
    /// Configuration file already exists
    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),
    /// Failed to create the target directory
    #[error("failed to create directory: {0}")]
    CreateDir(#[source] std::io::Error),
    /// Failed to write the configuration file
    #[error("failed to write {CONFIG_FILE_NAME}: {0}")]
    WriteFile(#[source] std::io::Error),
}

/// Write a starter `assetflow.toml` into `dir`.
///
/// Never overwrites an existing file. Returns the path written.
pub fn init_project(dir: &Path) -> Result<PathBuf, InitError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(InitError::AlreadyExists(path));
    }

    fs::create_dir_all(dir).map_err(InitError::CreateDir)?;
    fs::write(&path, starter_config(&project_name(dir))).map_err(InitError::WriteFile)?;
    Ok(path)
}

fn project_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "site".to_string())
}

fn starter_config(name: &str) -> String {
    // directory names may hold quotes or backslashes
    let name = toml::Value::String(name.to_string());
    format!(
        r#"[project]
name = {name}
app = "app"
dist = "dist"

[styles]
entry = "app/scss/style.scss"
out_dir = "app/css"
output = "style.min.css"
browsers = ["last 10 versions"]
sourcemaps = true

[scripts]
entries = ["app/js/main.js"]
out_dir = "app/js"
output = "main.min.js"
target = "es2015"
sourcemaps = true

[images]
src = "app/images"
dest = "dist/images"
jpeg_quality = 75
png_level = 5

[libs]
sources = ["node_modules/reset.css/reset.css"]
output = "app/scss/_libs.scss"

[server]
root = "app"
port = 3000
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("my-site");

        let path = init_project(&dir).unwrap();
        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.project.name, "my-site");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.scripts.entries, vec!["app/js/main.js".to_string()]);
    }

    #[test]
    fn test_init_escapes_unusual_directory_names() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("say \"hi\" \\ bye");

        let path = init_project(&dir).unwrap();
        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.project.name, "say \"hi\" \\ bye");
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "# mine\n").unwrap();

        let err = init_project(temp.path()).unwrap_err();
        assert!(matches!(err, InitError::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(temp.path().join(CONFIG_FILE_NAME)).unwrap(), "# mine\n");
    }
}
