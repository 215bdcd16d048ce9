//! Release tree tasks: clean and assemble

use crate::build::discovery::resolve_sources;
use crate::build::TaskContext;
use crate::error::TaskError;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Delete the release tree. A tree that does not exist is already clean.
pub async fn clean_dist(ctx: &TaskContext) -> Result<Vec<PathBuf>, TaskError> {
    let dist = ctx.dist_dir();
    match tokio::fs::remove_dir_all(&dist).await {
        Ok(()) => {
            tracing::debug!("cleanDist: removed {}", dist.display());
            Ok(vec![])
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
        Err(e) => Err(TaskError::io(&dist, e)),
    }
}

/// Copy `release.sources` into the release tree.
///
/// Paths are made relative to `release.base`; files outside the base keep
/// their path relative to the project root.
pub async fn assemble(ctx: &TaskContext) -> Result<Vec<PathBuf>, TaskError> {
    let release = &ctx.config().release;
    let base = ctx.resolve_path(&release.base);
    let dist = ctx.dist_dir();

    let files = resolve_sources(ctx.project_root(), &release.sources)?;
    let mut written = Vec::with_capacity(files.len());

    for file in files {
        let relative = match file.strip_prefix(&base) {
            Ok(relative) => relative,
            Err(_) => ctx.relative(&file),
        };
        let target = dist.join(relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| TaskError::io(parent, e))?;
        }
        tokio::fs::copy(&file, &target).await.map_err(|e| TaskError::io(&file, e))?;
        tracing::debug!("assemble: {}", relative.display());
        written.push(target);
    }

    Ok(written)
}
