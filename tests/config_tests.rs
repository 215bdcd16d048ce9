//! Configuration discovery tests
//!
//! These change the process working directory, so they run serially.

use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use assetflow::config::{find_config, load_config, CONFIG_FILE_NAME};

/// Run `f` with the working directory set to `dir`.
fn in_dir<F, R>(dir: &Path, f: F) -> R
where
    F: FnOnce() -> R,
{
    let original_dir = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir).unwrap();

    let result = f();

    std::env::set_current_dir(original_dir).unwrap();
    result
}

fn canonical(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap()
}

#[test]
#[serial]
fn test_config_found_from_nested_directory() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(CONFIG_FILE_NAME), "[project]\nname = \"shop\"\n").unwrap();
    let nested = temp.path().join("app/scss/partials");
    fs::create_dir_all(&nested).unwrap();

    let found = in_dir(&nested, find_config).unwrap();

    assert_eq!(canonical(found), canonical(temp.path().join(CONFIG_FILE_NAME)));
}

#[test]
#[serial]
fn test_load_config_without_file_uses_directory_name() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("landing-page");
    fs::create_dir_all(&project).unwrap();
    let xdg = temp.path().join("xdg");
    fs::create_dir_all(&xdg).unwrap();

    let original_xdg = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", &xdg);
    let config = in_dir(&project, || load_config(None));
    match original_xdg {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    let config = config.unwrap();
    assert_eq!(config.project.name, "landing-page");
    assert_eq!(config.styles.output, "style.min.css");
    assert_eq!(config.images.dest, PathBuf::from("dist/images"));
}

#[test]
#[serial]
fn test_xdg_config_is_the_fallback() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("project");
    fs::create_dir_all(&project).unwrap();
    let xdg = temp.path().join("xdg");
    fs::create_dir_all(xdg.join("assetflow")).unwrap();
    fs::write(xdg.join("assetflow").join(CONFIG_FILE_NAME), "[server]\nport = 9000\n").unwrap();

    let original_xdg = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", &xdg);
    let config = in_dir(&project, || load_config(None));
    match original_xdg {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    assert_eq!(config.unwrap().server.port, 9000);
}
