//! Source file discovery.
//!
//! Resolves ordered source lists (glob patterns with `!` exclusions) into
//! concrete files, the way script entries, library lists and release sources
//! are declared in the configuration.

use crate::error::TaskError;
use glob::{glob_with, MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Options shared by discovery and watch matching: `*` never crosses a `/`.
pub const MATCH_OPTIONS: MatchOptions =
    MatchOptions { case_sensitive: true, require_literal_separator: true, require_literal_leading_dot: false };

/// Check whether a pattern contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Compile a pattern, mapping parser errors into task errors.
pub fn compile_pattern(pattern: &str) -> Result<Pattern, TaskError> {
    Pattern::new(pattern)
        .map_err(|e| TaskError::Pattern { pattern: pattern.to_string(), message: e.to_string() })
}

/// Check whether `relative` (a path relative to the project root) matches any pattern.
pub fn matches_any(patterns: &[Pattern], relative: &Path) -> bool {
    patterns.iter().any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
}

/// Resolve an ordered source list relative to `base_dir`.
///
/// - Files are returned in pattern order; within one glob, sorted by path.
/// - A file matched by several patterns appears once, at its first position.
/// - Patterns starting with `!` remove matches, wherever they appear in the list.
/// - A literal (non-glob) path that does not exist is an error.
pub fn resolve_sources(base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, TaskError> {
    let mut excludes = Vec::new();
    for pattern in patterns.iter().filter_map(|p| p.strip_prefix('!')) {
        excludes.push(compile_pattern(pattern)?);
    }

    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
        let matched = if is_glob(pattern) {
            discover_files(base_dir, pattern)?
        } else {
            let path = base_dir.join(pattern);
            if !path.is_file() {
                return Err(TaskError::MissingSource(PathBuf::from(pattern)));
            }
            vec![path]
        };

        for path in matched {
            let relative = path.strip_prefix(base_dir).unwrap_or(&path);
            if matches_any(&excludes, relative) {
                continue;
            }
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

/// Discover files matching a glob pattern.
///
/// Directories are skipped. Unreadable entries are logged and skipped.
pub fn discover_files(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, TaskError> {
    let full_pattern = base_dir.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let paths = glob_with(&pattern_str, MATCH_OPTIONS)
        .map_err(|e| TaskError::Pattern { pattern: pattern.to_string(), message: e.to_string() })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                tracing::warn!("error reading path: {}", e);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Recursively list every file under a directory, sorted.
///
/// A missing directory yields an empty list.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, TaskError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    discover_files(dir, "**/*")
}
