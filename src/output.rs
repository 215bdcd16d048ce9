//! Output writing for compiled assets and their source maps

use crate::error::TaskError;
use std::path::{Path, PathBuf};

/// Directory (relative to the asset) that receives source maps.
pub const MAPS_DIR: &str = "maps";

/// How the `sourceMappingURL` trailer is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapComment {
    /// `/*# sourceMappingURL=... */`
    Css,
    /// `//# sourceMappingURL=...`
    Js,
}

impl MapComment {
    fn trailer(self, url: &str) -> String {
        match self {
            MapComment::Css => format!("\n/*# sourceMappingURL={} */\n", url),
            MapComment::Js => format!("\n//# sourceMappingURL={}\n", url),
        }
    }
}

/// A compiled asset ready to be written.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Compiled code
    pub code: String,
    /// Source map JSON, when enabled
    pub map: Option<String>,
}

/// Write a file, creating parent directories if they don't exist.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| TaskError::io(parent, e))?;
        }
    }
    tokio::fs::write(path, contents).await.map_err(|e| TaskError::io(path, e))
}

/// Write an artifact as `<out_dir>/<name>` plus `<out_dir>/maps/<name>.map`.
///
/// The map is referenced from a trailer comment in the asset. Returns the
/// written paths, asset first.
pub async fn write_artifact(
    out_dir: &Path,
    name: &str,
    artifact: &Artifact,
    comment: MapComment,
) -> Result<Vec<PathBuf>, TaskError> {
    let asset_path = out_dir.join(name);

    match &artifact.map {
        Some(map) => {
            let map_name = format!("{}.map", name);
            let map_path = out_dir.join(MAPS_DIR).join(&map_name);
            let url = format!("{}/{}", MAPS_DIR, map_name);

            let mut code = artifact.code.trim_end().to_string();
            code.push_str(&comment.trailer(&url));

            write_file(&asset_path, code).await?;
            write_file(&map_path, map).await?;
            Ok(vec![asset_path, map_path])
        }
        None => {
            write_file(&asset_path, &artifact.code).await?;
            Ok(vec![asset_path])
        }
    }
}

/// Render a path with `/` separators, for source map `sources` entries.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
