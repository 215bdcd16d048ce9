//! Library aggregation task
//!
//! Concatenates third-party stylesheets into the SCSS partial that the entry
//! stylesheet imports.

use crate::build::discovery::resolve_sources;
use crate::build::TaskContext;
use crate::error::TaskError;
use crate::output::write_file;
use std::path::PathBuf;

/// Write `libs.output` as the newline-joined contents of `libs.sources`.
pub async fn aggregate_libs(ctx: &TaskContext) -> Result<Vec<PathBuf>, TaskError> {
    let config = &ctx.config().libs;
    let sources = resolve_sources(ctx.project_root(), &config.sources)?;

    let mut parts = Vec::with_capacity(sources.len());
    for source in &sources {
        let text = tokio::fs::read_to_string(source).await.map_err(|e| TaskError::io(source, e))?;
        parts.push(text);
    }

    let output = ctx.resolve_path(&config.output);
    write_file(&output, parts.join("\n")).await?;

    tracing::debug!("cssLibs: {} file(s) -> {}", sources.len(), output.display());
    Ok(vec![output])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetConfig;
    use std::fs;
    use tempfile::TempDir;

    fn context(root: &std::path::Path, sources: &[&str]) -> TaskContext {
        let mut config = AssetConfig::default();
        config.libs.sources = sources.iter().map(|s| s.to_string()).collect();
        TaskContext::new(config, root.to_path_buf())
    }

    #[tokio::test]
    async fn test_concatenates_in_order() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("vendor")).unwrap();
        fs::write(temp.path().join("vendor/reset.css"), "html{margin:0}").unwrap();
        fs::write(temp.path().join("vendor/grid.css"), ".row{display:flex}").unwrap();

        let ctx = context(temp.path(), &["vendor/reset.css", "vendor/grid.css"]);
        let written = aggregate_libs(&ctx).await.unwrap();

        assert_eq!(written, vec![temp.path().join("app/scss/_libs.scss")]);
        let partial = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(partial, "html{margin:0}\n.row{display:flex}");
    }

    #[tokio::test]
    async fn test_missing_library_is_an_error() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path(), &["node_modules/reset.css/reset.css"]);

        let err = aggregate_libs(&ctx).await.unwrap_err();
        assert!(matches!(err, TaskError::MissingSource(_)));
        assert!(!temp.path().join("app/scss/_libs.scss").exists());
    }
}
