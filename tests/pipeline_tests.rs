//! Pipeline integration tests
//!
//! Runs the named tasks and the release composition against temporary
//! project trees laid out the conventional way:
//!
//! - Library aggregation feeding the style build
//! - Style and script builds with source maps
//! - Release composition producing exactly the declared files

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use assetflow::build::{TaskContext, TaskKind, TaskRunner};
use assetflow::config::default_config;
use assetflow::reload::{CollectingNotifier, ReloadEvent};

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a file with content, making parent directories.
fn create_test_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// Write a small PNG with enough variation to be worth compressing.
fn create_test_png(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbImage::from_fn(32, 32, |x, y| {
        image::Rgb([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8])
    });
    img.save(&path).unwrap();
}

/// A project with one of everything.
fn create_test_project() -> (TempDir, TaskContext, Arc<CollectingNotifier>) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    create_test_file(root, "node_modules/reset.css/reset.css", "html { margin: 0; }\n");
    create_test_file(
        root,
        "app/scss/style.scss",
        "@import \"libs\";\n$brand: #ff0000;\n.button {\n  color: $brand;\n  user-select: none;\n}\n",
    );
    create_test_file(
        root,
        "app/js/main.js",
        "function power(a, b) {\n  return a ** b;\n}\nconsole.log(power(2, 10));\n",
    );
    create_test_file(root, "app/index.html", "<html><body><h1>Home</h1></body></html>\n");
    create_test_png(root, "app/images/logo.png");
    create_test_file(
        root,
        "app/images/icons/star.svg",
        "<?xml version=\"1.0\"?>\n<!-- star -->\n<svg width=\"10\" height=\"10\" viewBox=\"0 0 10 10\">\n  <path d=\"M0 0h10v10z\"/>\n</svg>\n",
    );

    let notifier = Arc::new(CollectingNotifier::new());
    let ctx = TaskContext::new(default_config(), root.to_path_buf())
        .with_notifier(notifier.clone());
    (temp, ctx, notifier)
}

/// Every file under `dir`, relative to it.
fn file_set(dir: &Path) -> BTreeSet<String> {
    let mut files = BTreeSet::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(dir).unwrap();
                files.insert(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    files
}

// ============================================================================
// Development tasks
// ============================================================================

#[tokio::test]
async fn test_libs_feed_the_style_build() {
    let (temp, ctx, notifier) = create_test_project();
    let runner = TaskRunner::new(ctx);

    let libs = runner.run(TaskKind::CssLibs).await;
    assert!(libs.is_success(), "cssLibs failed: {}", libs.status);
    let styles = runner.run(TaskKind::Styles).await;
    assert!(styles.is_success(), "styles failed: {}", styles.status);

    let css = fs::read_to_string(temp.path().join("app/css/style.min.css")).unwrap();
    assert!(css.starts_with("html{margin:0}"), "libs not first: {}", css);
    assert!(css.contains(".button{"));
    assert!(css.contains("-webkit-user-select:none"));
    assert!(!css.contains("$brand"));
    assert!(css.trim_end().ends_with("/*# sourceMappingURL=maps/style.min.css.map */"));

    let map = fs::read_to_string(temp.path().join("app/css/maps/style.min.css.map")).unwrap();
    let map: serde_json::Value = serde_json::from_str(&map).unwrap();
    assert_eq!(map["version"], 3);
    assert_eq!(map["sources"], serde_json::json!(["app/scss/style.scss"]));

    assert_eq!(notifier.events(), vec![ReloadEvent::css("css/style.min.css")]);
}

#[tokio::test]
async fn test_script_build_output() {
    let (temp, ctx, notifier) = create_test_project();
    let result = TaskRunner::new(ctx).run(TaskKind::Scripts).await;

    assert!(result.is_success(), "scripts failed: {}", result.status);
    assert_eq!(
        result.outputs,
        vec![
            temp.path().join("app/js/main.min.js"),
            temp.path().join("app/js/maps/main.min.js.map")
        ]
    );

    let js = fs::read_to_string(temp.path().join("app/js/main.min.js")).unwrap();
    assert!(js.contains("function power("));
    assert!(!js.contains("**"));
    assert!(js.contains("sourceMappingURL=maps/main.min.js.map"));

    assert_eq!(notifier.events(), vec![ReloadEvent::Reload]);
}

#[tokio::test]
async fn test_script_syntax_error_names_the_file() {
    let (temp, ctx, notifier) = create_test_project();
    create_test_file(temp.path(), "app/js/main.js", "var x = ;\nconsole.log(x);\n");

    let result = TaskRunner::new(ctx).run(TaskKind::Scripts).await;

    assert!(result.is_failure());
    assert!(result.status.to_string().contains("main.js:1"), "{}", result.status);
    assert!(!temp.path().join("app/js/main.min.js").exists());
    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn test_style_error_leaves_previous_output() {
    let (temp, ctx, _) = create_test_project();
    let runner = TaskRunner::new(ctx);
    runner.run(TaskKind::CssLibs).await;
    assert!(runner.run(TaskKind::Styles).await.is_success());
    let before = fs::read_to_string(temp.path().join("app/css/style.min.css")).unwrap();

    create_test_file(temp.path(), "app/scss/style.scss", ".a { color: $missing; }\n");
    let result = runner.run(TaskKind::Styles).await;

    assert!(result.is_failure());
    assert!(result.status.to_string().contains("app/scss/style.scss"), "{}", result.status);
    let after = fs::read_to_string(temp.path().join("app/css/style.min.css")).unwrap();
    assert_eq!(before, after);
}

// ============================================================================
// Release composition
// ============================================================================

#[tokio::test]
async fn test_release_tree_holds_exactly_the_declared_files() {
    let (temp, ctx, _) = create_test_project();
    create_test_file(temp.path(), "dist/old/leftover.txt", "stale");
    let runner = TaskRunner::new(ctx);

    for kind in [TaskKind::CssLibs, TaskKind::Styles, TaskKind::Scripts] {
        assert!(runner.run(kind).await.is_success(), "{} failed", kind);
    }
    let result = runner.release().await;
    assert!(result.is_success(), "{}", result.summary());

    let expected: BTreeSet<String> = [
        "css/style.min.css",
        "images/icons/star.svg",
        "images/logo.png",
        "index.html",
        "js/main.min.js",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(file_set(&temp.path().join("dist")), expected);

    assert_eq!(
        fs::read(temp.path().join("dist/index.html")).unwrap(),
        fs::read(temp.path().join("app/index.html")).unwrap()
    );
    let svg = fs::read_to_string(temp.path().join("dist/images/icons/star.svg")).unwrap();
    assert!(!svg.contains("<!--"));
    assert!(!svg.contains("viewBox"));
}

#[tokio::test]
async fn test_clean_removes_release_tree() {
    let (temp, ctx, _) = create_test_project();
    create_test_file(temp.path(), "dist/images/logo.png", "x");

    let result = TaskRunner::new(ctx).run_one(TaskKind::CleanDist).await;

    assert!(result.is_success());
    assert!(!temp.path().join("dist").exists());
}

#[tokio::test]
async fn test_release_without_built_files_fails_at_assemble() {
    let (temp, ctx, _) = create_test_project();

    let result = TaskRunner::new(ctx).release().await;

    assert!(!result.is_success());
    assert_eq!(result.ran(), vec![TaskKind::CleanDist, TaskKind::Images, TaskKind::Assemble]);
    assert_eq!(result.failures()[0].task, TaskKind::Assemble);
    // images finished before assemble ran
    assert!(temp.path().join("dist/images/logo.png").is_file());
}
