//! Watch mode for automatic rebuilds on file changes
//!
//! Only the directories the watch rules can match are subscribed to, so
//! dependency and release trees never produce events. Changes arrive in
//! debounced batches. Each batch is matched against the watch rules, reduced to a de-duplicated list of
//! actions, and those actions run one after another on the watch loop. A
//! failing action is reported and watching continues.

use crate::build::discovery::{compile_pattern, matches_any};
use crate::build::{format_duration, record, TaskContext, TaskKind, TaskOutput, TaskResult};
use crate::config::{WatchAction, WatchRuleConfig};
use crate::error::TaskError;
use crate::reload::ReloadEvent;
use crate::{scripts, styles};
use glob::Pattern;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEvent};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch {}: {source}", .path.display())]
    WatchPath {
        /// Directory that could not be watched
        path: PathBuf,
        /// Underlying error
        #[source]
        source: notify::Error,
    },
    /// A watch rule has an invalid pattern
    #[error("invalid watch rule: {0}")]
    Rule(#[source] TaskError),
    /// The watcher stopped delivering events
    #[error("Watch channel closed")]
    ChannelClosed,
}

/// A compiled watch rule.
#[derive(Debug, Clone)]
pub struct WatchRule {
    /// What to run
    pub action: WatchAction,
    patterns: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl WatchRule {
    /// Compile a rule from configuration.
    pub fn compile(config: &WatchRuleConfig) -> Result<Self, WatchError> {
        let compile_all = |patterns: &[String]| {
            patterns.iter().map(|p| compile_pattern(p)).collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            action: config.action,
            patterns: compile_all(&config.patterns).map_err(WatchError::Rule)?,
            exclude: compile_all(&config.exclude).map_err(WatchError::Rule)?,
        })
    }

    /// Check whether a path relative to the project root triggers this rule.
    pub fn matches(&self, relative: &Path) -> bool {
        matches_any(&self.patterns, relative) && !matches_any(&self.exclude, relative)
    }
}

/// Compile every configured rule.
pub fn compile_rules(rules: &[WatchRuleConfig]) -> Result<Vec<WatchRule>, WatchError> {
    rules.iter().map(WatchRule::compile).collect()
}

/// A directory the watcher subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRoot {
    /// Absolute directory
    pub path: PathBuf,
    /// Whether events from subdirectories are wanted
    pub recursive: bool,
}

fn is_glob(component: &str) -> bool {
    component.chars().any(|c| matches!(c, '*' | '?' | '['))
}

/// Literal directory a pattern is anchored at, and whether it can match
/// below that directory's direct children.
///
/// A pattern without glob characters names a file; its parent is returned.
fn pattern_base(pattern: &str) -> (PathBuf, bool) {
    let parts: Vec<&str> =
        pattern.split('/').filter(|part| !part.is_empty() && *part != ".").collect();
    let literal = parts.iter().take_while(|part| !is_glob(part)).count();

    if literal == parts.len() {
        let base = parts[..literal.saturating_sub(1)].iter().collect();
        return (base, false);
    }
    let rest = &parts[literal..];
    let recursive = rest.len() > 1 || rest.iter().any(|part| part.contains("**"));
    (parts[..literal].iter().collect(), recursive)
}

/// Directories to watch for `rules`, under `root`.
///
/// Nested directories already covered by a recursive watch are dropped.
/// Directories that do not exist are skipped with a warning.
pub fn watch_roots(rules: &[WatchRuleConfig], root: &Path) -> Vec<WatchRoot> {
    let mut wanted: BTreeMap<PathBuf, bool> = BTreeMap::new();
    for pattern in rules.iter().flat_map(|rule| rule.patterns.iter()) {
        let (base, recursive) = pattern_base(pattern);
        let dir = if base.as_os_str().is_empty() { root.to_path_buf() } else { root.join(base) };
        *wanted.entry(dir).or_insert(false) |= recursive;
    }

    let mut roots: Vec<WatchRoot> = Vec::new();
    for (path, recursive) in wanted {
        if roots.iter().any(|r| r.recursive && path.starts_with(&r.path)) {
            continue;
        }
        if !path.is_dir() {
            tracing::warn!("not watching {}: directory does not exist", path.display());
            continue;
        }
        roots.push(WatchRoot { path, recursive });
    }
    roots
}

/// Actions triggered by one batch of changed paths, each at most once.
///
/// Order is fixed: styles, scripts, then reload.
pub fn plan_actions(rules: &[WatchRule], changed: &[PathBuf]) -> Vec<WatchAction> {
    let actions: BTreeSet<WatchAction> = changed
        .iter()
        .flat_map(|path| rules.iter().filter(move |rule| rule.matches(path)).map(|r| r.action))
        .collect();
    actions.into_iter().collect()
}

/// Run planned actions in order on the calling task.
///
/// Builds announce their own output; `reload` only notifies browsers.
pub async fn dispatch(actions: &[WatchAction], ctx: &TaskContext) -> Vec<TaskResult> {
    let mut results = Vec::new();
    for action in actions {
        match action {
            WatchAction::Styles => {
                let build = async { styles::build_styles(ctx).await.map(TaskOutput::from) };
                results.push(record(TaskKind::Styles, build).await);
            }
            WatchAction::Scripts => {
                let build = async { scripts::build_scripts(ctx).await.map(TaskOutput::from) };
                results.push(record(TaskKind::Scripts, build).await);
            }
            WatchAction::Reload => ctx.notifier().notify(ReloadEvent::Reload),
        }
    }
    results
}

/// Tracks failing tasks across rebuilds for recovery detection
#[derive(Debug, Default)]
pub struct ErrorTracker {
    /// Tasks that failed in the previous rebuild
    failing: HashSet<TaskKind>,
}

impl ErrorTracker {
    /// Create a new error tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with the latest results, returning tasks that recovered
    pub fn update(&mut self, results: &[TaskResult]) -> Vec<TaskKind> {
        let mut fixed = Vec::new();
        for result in results {
            if result.is_success() {
                if self.failing.remove(&result.task) {
                    fixed.push(result.task);
                }
            } else {
                self.failing.insert(result.task);
            }
        }
        fixed
    }

    /// Check if there are any tracked errors
    pub fn has_errors(&self) -> bool {
        !self.failing.is_empty()
    }
}

/// Watch the rule directories and rebuild until the process exits.
pub async fn watch(ctx: &TaskContext) -> Result<(), WatchError> {
    let config = &ctx.config().watch;
    let rules = compile_rules(&config.rules)?;
    let root = ctx
        .project_root()
        .canonicalize()
        .unwrap_or_else(|_| ctx.project_root().to_path_buf());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut debouncer = new_debouncer(
        Duration::from_millis(u64::from(config.debounce_ms)),
        move |result: DebounceEventResult| {
            // Receiver gone means the loop has ended
            let _ = tx.send(result);
        },
    )
    .map_err(WatchError::WatcherInit)?;

    let watched = watch_roots(&config.rules, &root);
    if watched.is_empty() {
        tracing::warn!("no watch rule matches an existing directory");
    }
    for dir in &watched {
        let mode = if dir.recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
        debouncer
            .watcher()
            .watch(&dir.path, mode)
            .map_err(|source| WatchError::WatchPath { path: dir.path.clone(), source })?;
        tracing::debug!("watching {} (recursive: {})", dir.path.display(), dir.recursive);
    }

    let mut tracker = ErrorTracker::new();
    println!("[{}] Watching {} for changes...", timestamp(), ctx.project_root().display());

    while let Some(batch) = rx.recv().await {
        let events = match batch {
            Ok(events) => events,
            Err(error) => {
                tracing::warn!("Watch error: {}", error);
                eprintln!("[{}] Continuing to watch...", timestamp());
                continue;
            }
        };

        let changed = changed_paths(&root, &events);
        let actions = plan_actions(&rules, &changed);
        if actions.is_empty() {
            continue;
        }

        if config.clear_screen {
            clear_screen();
        }
        for path in changed.iter().filter(|p| rules.iter().any(|r| r.matches(p))) {
            println!("[{}] Changed: {}", timestamp(), path.display());
        }

        println!("[{}] Building...", timestamp());
        let results = dispatch(&actions, ctx).await;
        let fixed = tracker.update(&results);
        print_results(&results, &fixed, ctx);
        if tracker.has_errors() {
            println!("[{}] Watching for changes (fix the errors above)...", timestamp());
        } else {
            println!("[{}] Watching for changes...", timestamp());
        }
    }

    Err(WatchError::ChannelClosed)
}

/// Paths in a batch, relative to `root`, sorted and unique.
fn changed_paths(root: &Path, events: &[DebouncedEvent]) -> Vec<PathBuf> {
    let paths: BTreeSet<PathBuf> = events
        .iter()
        .filter_map(|event| event.path.strip_prefix(root).ok())
        .map(Path::to_path_buf)
        .collect();
    paths.into_iter().collect()
}

/// Clear the terminal screen
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Print rebuild results to console with recovered task notifications
fn print_results(results: &[TaskResult], fixed: &[TaskKind], ctx: &TaskContext) {
    for task in fixed {
        println!("[{}] Fixed: {}", timestamp(), task);
    }

    for result in results {
        if result.is_success() {
            println!(
                "[{}] {} complete ({}) - {} file{}",
                timestamp(),
                result.task,
                format_duration(result.duration),
                result.outputs.len(),
                if result.outputs.len() == 1 { "" } else { "s" }
            );
            if ctx.is_verbose() {
                for output in &result.outputs {
                    println!("[{}]   {}", timestamp(), ctx.relative(output).display());
                }
            }
        } else {
            eprintln!(
                "[{}] {} failed ({}) - {}",
                timestamp(),
                result.task,
                format_duration(result.duration),
                result.status
            );
        }
        for warning in &result.warnings {
            eprintln!("[{}] Warning: {}", timestamp(), warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::TaskStatus;
    use crate::config::{AssetConfig, WatchConfig};
    use crate::reload::CollectingNotifier;
    use notify_debouncer_mini::DebouncedEventKind;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn default_rules() -> Vec<WatchRule> {
        compile_rules(&WatchConfig::default().rules).unwrap()
    }

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_default_rules_match_sources() {
        let rules = default_rules();

        assert_eq!(
            plan_actions(&rules, &paths(&["app/scss/base/_type.scss"])),
            vec![WatchAction::Styles]
        );
        assert_eq!(plan_actions(&rules, &paths(&["app/js/main.js"])), vec![WatchAction::Scripts]);
        assert_eq!(plan_actions(&rules, &paths(&["app/index.html"])), vec![WatchAction::Reload]);
    }

    #[test]
    fn test_built_script_is_excluded() {
        let rules = default_rules();
        assert!(plan_actions(&rules, &paths(&["app/js/main.min.js"])).is_empty());
    }

    #[test]
    fn test_outputs_and_nested_html_do_not_trigger() {
        let rules = default_rules();
        let changed = paths(&[
            "app/css/style.min.css",
            "app/partials/nav.html",
            "dist/index.html",
            "node_modules/pkg/index.js",
        ]);
        assert!(plan_actions(&rules, &changed).is_empty());
    }

    #[test]
    fn test_batch_actions_are_deduplicated_and_ordered() {
        let rules = default_rules();
        let changed = paths(&[
            "app/index.html",
            "app/scss/a.scss",
            "app/scss/b.scss",
            "app/js/main.js",
            "app/scss/c.scss",
        ]);

        assert_eq!(
            plan_actions(&rules, &changed),
            vec![WatchAction::Styles, WatchAction::Scripts, WatchAction::Reload]
        );
    }

    #[test]
    fn test_pattern_base() {
        assert_eq!(pattern_base("app/scss/**/*.scss"), (PathBuf::from("app/scss"), true));
        assert_eq!(pattern_base("app/*.html"), (PathBuf::from("app"), false));
        assert_eq!(pattern_base("app/js/*/*.js"), (PathBuf::from("app/js"), true));
        assert_eq!(pattern_base("app/index.html"), (PathBuf::from("app"), false));
        assert_eq!(pattern_base("**/*.js"), (PathBuf::new(), true));
    }

    #[test]
    fn test_watch_roots_skip_dependency_and_release_trees() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for dir in ["app/scss/base", "app/js", "node_modules/pkg", "dist/css"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }

        let roots = watch_roots(&WatchConfig::default().rules, root);

        assert_eq!(
            roots,
            vec![
                WatchRoot { path: root.join("app"), recursive: false },
                WatchRoot { path: root.join("app/js"), recursive: true },
                WatchRoot { path: root.join("app/scss"), recursive: true },
            ]
        );
        for dir in ["node_modules/pkg", "dist/css"] {
            assert!(!roots.iter().any(|r| root.join(dir).starts_with(&r.path)), "{} watched", dir);
        }
    }

    #[test]
    fn test_watch_roots_merge_nested_and_skip_missing() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/components")).unwrap();
        let rule = |pattern: &str| WatchRuleConfig {
            patterns: vec![pattern.to_string()],
            exclude: vec![],
            action: WatchAction::Reload,
        };
        let rules =
            vec![rule("src/**/*.html"), rule("src/components/*.html"), rule("missing/*.html")];

        assert_eq!(
            watch_roots(&rules, root),
            vec![WatchRoot { path: root.join("src"), recursive: true }]
        );
    }

    #[test]
    fn test_invalid_rule_pattern() {
        let rule = WatchRuleConfig {
            patterns: vec!["app/[.scss".to_string()],
            exclude: vec![],
            action: WatchAction::Styles,
        };
        assert!(matches!(WatchRule::compile(&rule), Err(WatchError::Rule(_))));
    }

    #[test]
    fn test_changed_paths_relative_and_unique() {
        let root = Path::new("/project");
        let event = |path: &str| DebouncedEvent {
            path: PathBuf::from(path),
            kind: DebouncedEventKind::Any,
        };
        let events = vec![
            event("/project/app/scss/a.scss"),
            event("/project/app/scss/a.scss"),
            event("/elsewhere/b.scss"),
        ];

        assert_eq!(changed_paths(root, &events), paths(&["app/scss/a.scss"]));
    }

    #[tokio::test]
    async fn test_style_change_builds_once_and_notifies_once() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("app/scss")).unwrap();
        fs::write(temp.path().join("app/scss/style.scss"), "body { color: red; }").unwrap();

        let notifier = Arc::new(CollectingNotifier::new());
        let ctx = TaskContext::new(AssetConfig::default(), temp.path().to_path_buf())
            .with_notifier(notifier.clone());

        let changed =
            paths(&["app/scss/style.scss", "app/scss/_vars.scss", "app/scss/_mixins.scss"]);
        let actions = plan_actions(&default_rules(), &changed);
        let results = dispatch(&actions, &ctx).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].task, TaskKind::Styles);
        assert!(results[0].is_success());
        assert_eq!(notifier.events(), vec![ReloadEvent::css("css/style.min.css")]);
    }

    #[tokio::test]
    async fn test_failing_build_is_reported_not_fatal() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("app/scss")).unwrap();
        fs::write(temp.path().join("app/scss/style.scss"), "body { color: red").unwrap();

        let notifier = Arc::new(CollectingNotifier::new());
        let ctx = TaskContext::new(AssetConfig::default(), temp.path().to_path_buf())
            .with_notifier(notifier.clone());

        let results = dispatch(&[WatchAction::Styles, WatchAction::Reload], &ctx).await;

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].status, TaskStatus::Failed(_)));
        assert!(!temp.path().join("app/css/style.min.css").exists());
        assert_eq!(notifier.events(), vec![ReloadEvent::Reload]);
    }

    #[test]
    fn test_error_tracker_reports_recovery() {
        let mut tracker = ErrorTracker::new();
        let failed = TaskResult::failed(TaskKind::Scripts, "boom".to_string(), Duration::ZERO);
        let passed = TaskResult::success(TaskKind::Scripts, vec![], Duration::ZERO);

        assert!(tracker.update(&[failed]).is_empty());
        assert!(tracker.has_errors());
        assert_eq!(tracker.update(&[passed.clone()]), vec![TaskKind::Scripts]);
        assert!(!tracker.has_errors());
        assert!(tracker.update(&[passed]).is_empty());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.matches(':').count(), 2);
    }
}
