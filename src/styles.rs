//! Style build task
//!
//! SCSS entry → plain CSS (grass) → vendor prefixes for the configured
//! browsers and minification (lightningcss) → `style.min.css` plus an
//! optional source map. Finished builds are announced as stylesheet swaps.

use crate::build::TaskContext;
use crate::error::{CompileError, TaskError};
use crate::output::{slash_path, write_artifact, Artifact, MapComment};
use crate::reload::ReloadEvent;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use std::path::{Path, PathBuf};

/// Build the configured stylesheet.
///
/// A compile error leaves the previous output untouched.
pub async fn build_styles(ctx: &TaskContext) -> Result<Vec<PathBuf>, TaskError> {
    let config = &ctx.config().styles;
    let entry = ctx.resolve_path(&config.entry);
    if !entry.is_file() {
        return Err(TaskError::MissingSource(config.entry.clone()));
    }

    let load_paths: Vec<PathBuf> = config.load_paths.iter().map(|p| ctx.resolve_path(p)).collect();
    let source_name = slash_path(ctx.relative(&entry));

    let css = compile_scss(&entry, &load_paths)
        .map_err(|mut e| {
            e.file = PathBuf::from(&source_name);
            e
        })
        .map_err(TaskError::Style)?;
    let artifact =
        process_css(&css, &source_name, &config.browsers, config.sourcemaps).map_err(TaskError::Style)?;

    let out_dir = ctx.resolve_path(&config.out_dir);
    let written = write_artifact(&out_dir, &config.output, &artifact, MapComment::Css).await?;

    let stylesheet = &written[0];
    match stylesheet.strip_prefix(ctx.serve_root()) {
        Ok(served) => ctx.notifier().notify(ReloadEvent::css(served)),
        Err(_) => ctx.notifier().notify(ReloadEvent::Reload),
    }

    tracing::debug!("styles: {} -> {}", source_name, stylesheet.display());
    Ok(written)
}

/// Compile an SCSS file to expanded CSS.
///
/// Imports resolve relative to the importing file, then through `load_paths`.
pub fn compile_scss(entry: &Path, load_paths: &[PathBuf]) -> Result<String, CompileError> {
    let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
    for path in load_paths {
        options = options.load_path(path);
    }

    grass::from_path(entry, &options).map_err(|e| parse_sass_error(entry, &e.to_string()))
}

/// Turn a Sass diagnostic into a located compile error.
///
/// Sass reports the location on the last line as `<file> <line>:<col>  root stylesheet`.
fn parse_sass_error(entry: &Path, text: &str) -> CompileError {
    let message = text
        .lines()
        .next()
        .unwrap_or(text)
        .trim()
        .trim_start_matches("Error: ")
        .to_string();

    let location = text.lines().rev().find_map(|line| {
        line.split_whitespace().find_map(|token| {
            let (line, col) = token.split_once(':')?;
            Some((line.parse::<usize>().ok()?, col.parse::<usize>().ok()?))
        })
    });

    match location {
        Some((line, col)) => CompileError::with_location(entry, line, col, message),
        None => CompileError::new(entry, message),
    }
}

/// Prefix and minify plain CSS, optionally producing a source map.
///
/// `source_name` labels the input in diagnostics and in the map's `sources`.
pub fn process_css(
    css: &str,
    source_name: &str,
    browsers: &[String],
    sourcemaps: bool,
) -> Result<Artifact, CompileError> {
    let browsers = Browsers::from_browserslist(browsers.iter())
        .map_err(|e| CompileError::new(source_name, format!("invalid browser query: {}", e)))?;
    let targets = Targets { browsers, ..Targets::default() };

    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions { filename: source_name.to_string(), ..ParserOptions::default() },
    )
    .map_err(|e| css_error(source_name, e))?;

    stylesheet
        .minify(MinifyOptions { targets: targets.clone(), ..MinifyOptions::default() })
        .map_err(|e| css_error(source_name, e))?;

    let mut source_map = None;
    if sourcemaps {
        let mut map = SourceMap::new("/");
        let index = map.add_source(source_name);
        map.set_source_content(index as usize, css)
            .map_err(|e| CompileError::new(source_name, format!("source map: {:?}", e)))?;
        source_map = Some(map);
    }
    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: source_map.as_mut(),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(source_name, e))?;

    let map = match source_map.as_mut() {
        Some(map) => Some(
            map.to_json(None)
                .map_err(|e| CompileError::new(source_name, format!("source map: {:?}", e)))?,
        ),
        None => None,
    };

    Ok(Artifact { code: printed.code, map })
}

fn css_error<T: std::fmt::Display>(
    source_name: &str,
    error: lightningcss::error::Error<T>,
) -> CompileError {
    match &error.loc {
        Some(loc) => CompileError::with_location(
            source_name,
            loc.line as usize + 1,
            loc.column as usize,
            error.kind.to_string(),
        ),
        None => CompileError::new(source_name, error.kind.to_string()),
    }
}
