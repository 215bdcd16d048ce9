//! Task context containing configuration and collaborators for a run.

use crate::config::AssetConfig;
use crate::reload::{LiveReload, NoReload, ReloadNotifier};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Task context containing configuration, paths and the live-reload sink.
///
/// Cheap to clone; concurrent tasks each hold their own copy.
#[derive(Clone)]
pub struct TaskContext {
    /// The loaded configuration
    config: Arc<AssetConfig>,
    /// Project root directory (where assetflow.toml is located)
    project_root: PathBuf,
    /// Where finished builds are announced
    notifier: Arc<dyn ReloadNotifier>,
    /// Hub the dev server streams from, when one is attached
    live_reload: Option<LiveReload>,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("project_root", &self.project_root)
            .field("live_reload", &self.live_reload.is_some())
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    /// Create a new task context that announces nothing.
    pub fn new(config: AssetConfig, project_root: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            project_root,
            notifier: Arc::new(NoReload),
            live_reload: None,
            verbose: false,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the live-reload sink.
    pub fn notifier(&self) -> &dyn ReloadNotifier {
        self.notifier.as_ref()
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set the live-reload sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn ReloadNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Announce through a live-reload hub and expose it to the dev server.
    pub fn with_live_reload(mut self, hub: LiveReload) -> Self {
        self.notifier = Arc::new(hub.clone());
        self.live_reload = Some(hub);
        self
    }

    /// The attached live-reload hub, if any.
    pub fn live_reload(&self) -> Option<&LiveReload> {
        self.live_reload.as_ref()
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Working tree (resolved to absolute path).
    pub fn app_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.app)
    }

    /// Release tree (resolved to absolute path).
    pub fn dist_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.dist)
    }

    /// Directory the dev server serves (resolved to absolute path).
    pub fn serve_root(&self) -> PathBuf {
        self.resolve_path(&self.config.server.root)
    }

    /// Express a path relative to the project root for display and source maps.
    ///
    /// Paths outside the root are returned unchanged.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.project_root).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::{CollectingNotifier, ReloadEvent};

    #[test]
    fn test_task_context_new() {
        let root = PathBuf::from("/project");
        let ctx = TaskContext::new(AssetConfig::default(), root.clone());

        assert_eq!(ctx.project_root(), &root);
        assert!(!ctx.is_verbose());
    }

    #[test]
    fn test_task_context_with_verbose() {
        let ctx = TaskContext::new(AssetConfig::default(), PathBuf::from("/project"))
            .with_verbose(true);
        assert!(ctx.is_verbose());
    }

    #[test]
    fn test_task_context_with_notifier() {
        let notifier = Arc::new(CollectingNotifier::new());
        let ctx = TaskContext::new(AssetConfig::default(), PathBuf::from("/project"))
            .with_notifier(notifier.clone());

        ctx.notifier().notify(ReloadEvent::Reload);
        assert_eq!(notifier.events(), vec![ReloadEvent::Reload]);
    }

    #[tokio::test]
    async fn test_task_context_with_live_reload() {
        let hub = LiveReload::new();
        let mut events = hub.subscribe();
        let ctx = TaskContext::new(AssetConfig::default(), PathBuf::from("/project"))
            .with_live_reload(hub);

        assert!(ctx.live_reload().is_some());
        ctx.notifier().notify(ReloadEvent::Reload);
        assert_eq!(events.recv().await.unwrap(), ReloadEvent::Reload);
    }

    #[test]
    fn test_task_context_resolve_path() {
        let ctx = TaskContext::new(AssetConfig::default(), PathBuf::from("/project"));

        assert_eq!(ctx.resolve_path(Path::new("/other/path")), PathBuf::from("/other/path"));
        assert_eq!(ctx.resolve_path(Path::new("app/js")), PathBuf::from("/project/app/js"));
    }

    #[test]
    fn test_task_context_trees() {
        let ctx = TaskContext::new(AssetConfig::default(), PathBuf::from("/project"));

        assert_eq!(ctx.app_dir(), PathBuf::from("/project/app"));
        assert_eq!(ctx.dist_dir(), PathBuf::from("/project/dist"));
        assert_eq!(ctx.serve_root(), PathBuf::from("/project/app"));
    }

    #[test]
    fn test_task_context_relative() {
        let ctx = TaskContext::new(AssetConfig::default(), PathBuf::from("/project"));

        assert_eq!(
            ctx.relative(Path::new("/project/app/scss/style.scss")),
            Path::new("app/scss/style.scss")
        );
        assert_eq!(ctx.relative(Path::new("/elsewhere/a.css")), Path::new("/elsewhere/a.css"));
    }
}
