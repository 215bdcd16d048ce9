//! Image compression task
//!
//! Walks the source images directory and writes every file into the
//! destination tree at the same relative path. Raster formats are re-encoded,
//! SVG is minified as text, anything else is copied. A result is only used
//! when it is strictly smaller than the original.

pub mod raster;
pub mod svg;

use crate::build::discovery::walk_files;
use crate::build::TaskContext;
use crate::config::ImagesConfig;
use crate::error::TaskError;
use crate::output::write_file;
use std::path::{Path, PathBuf};

/// Format of an image, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Gif,
    Jpeg,
    Png,
    Svg,
    /// Anything else; copied unchanged
    Other,
}

impl ImageKind {
    /// Classify a path by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "gif" => ImageKind::Gif,
            "jpg" | "jpeg" => ImageKind::Jpeg,
            "png" => ImageKind::Png,
            "svg" => ImageKind::Svg,
            _ => ImageKind::Other,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Re-encoded output was smaller and was written
    Optimized,
    /// Re-encoded output was not smaller; original bytes written
    Kept,
    /// Not an image type we handle; original bytes written
    Copied,
    /// Could not be processed; original bytes written
    Failed(String),
}

/// Per-file compression report.
#[derive(Debug, Clone)]
pub struct ImageReport {
    /// Source file
    pub source: PathBuf,
    /// Written file
    pub output: PathBuf,
    /// Outcome
    pub outcome: ImageOutcome,
    /// Size of the source in bytes
    pub original_size: u64,
    /// Size of the written file in bytes
    pub final_size: u64,
}

impl ImageReport {
    /// Bytes saved by compression.
    pub fn saved(&self) -> u64 {
        self.original_size.saturating_sub(self.final_size)
    }
}

/// Produce the bytes to write for one file and how they were obtained.
///
/// Never returns output larger than `bytes`.
pub fn process_image(kind: ImageKind, bytes: &[u8], config: &ImagesConfig) -> (Vec<u8>, ImageOutcome) {
    let attempt = match kind {
        ImageKind::Gif => raster::recompress_gif(bytes, config.gif_interlaced),
        ImageKind::Jpeg => raster::recompress_jpeg(bytes, config.jpeg_quality, config.jpeg_progressive),
        ImageKind::Png => raster::recompress_png(bytes, config.png_level),
        ImageKind::Svg => std::str::from_utf8(bytes)
            .map(|text| svg::minify_svg(text, &config.svg).into_bytes())
            .map_err(|e| format!("not valid UTF-8: {}", e)),
        ImageKind::Other => return (bytes.to_vec(), ImageOutcome::Copied),
    };

    match attempt {
        Ok(out) if out.len() < bytes.len() => (out, ImageOutcome::Optimized),
        Ok(_) => (bytes.to_vec(), ImageOutcome::Kept),
        Err(message) => (bytes.to_vec(), ImageOutcome::Failed(message)),
    }
}

/// Compress every file under `images.src` into `images.dest`.
///
/// Per-file failures are logged and the original is copied; only I/O errors
/// abort the task.
pub async fn compress_images(ctx: &TaskContext) -> Result<Vec<ImageReport>, TaskError> {
    let config = &ctx.config().images;
    let src = ctx.resolve_path(&config.src);
    let dest = ctx.resolve_path(&config.dest);

    let files = walk_files(&src)?;
    let mut reports = Vec::with_capacity(files.len());

    for file in files {
        let relative = file.strip_prefix(&src).unwrap_or(&file).to_path_buf();
        let bytes = tokio::fs::read(&file).await.map_err(|e| TaskError::io(&file, e))?;

        let (output, outcome) = process_image(ImageKind::from_path(&file), &bytes, config);
        if let ImageOutcome::Failed(message) = &outcome {
            tracing::warn!("{}: {}; copied unchanged", relative.display(), message);
        }

        let out_path = dest.join(&relative);
        write_file(&out_path, &output).await?;
        tracing::debug!(
            "images: {} {:?} ({} -> {} bytes)",
            relative.display(),
            outcome,
            bytes.len(),
            output.len()
        );

        reports.push(ImageReport {
            source: file,
            output: out_path,
            outcome,
            original_size: bytes.len() as u64,
            final_size: output.len() as u64,
        });
    }

    let saved: u64 = reports.iter().map(ImageReport::saved).sum();
    tracing::info!("images: {} file(s), saved {} bytes", reports.len(), saved);
    Ok(reports)
}
