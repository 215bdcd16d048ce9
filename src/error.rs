//! Error types shared by the build tasks.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A compile error with file location information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Path to the file containing the error
    pub file: PathBuf,
    /// Line number (1-indexed, None if unknown)
    pub line: Option<usize>,
    /// Column number (1-indexed, None if unknown)
    pub column: Option<usize>,
    /// Error message
    pub message: String,
}

impl CompileError {
    /// Create a new compile error with file and message
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self { file: file.into(), line: None, column: None, message: message.into() }
    }

    /// Create a compile error with full location information
    pub fn with_location(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self { file: file.into(), line: Some(line), column: Some(column), message: message.into() }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(col) = self.column {
                write!(f, ":{}", col)?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// Error raised by a single task. Never fatal to the watcher or dev server.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Reading or writing a file failed
    #[error("{}: {source}", .path.display())]
    Io {
        /// File that could not be read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Stylesheet failed to compile
    #[error("style error in {0}")]
    Style(CompileError),
    /// Script failed to parse or transform
    #[error("script error in {0}")]
    Script(CompileError),
    /// A literal source path did not exist
    #[error("File not found: {}", .0.display())]
    MissingSource(PathBuf),
    /// A source list matched no files at all
    #[error("no {0} sources matched")]
    NoSources(String),
    /// Invalid glob pattern in a source list
    #[error("invalid pattern '{pattern}': {message}")]
    Pattern {
        /// The offending pattern
        pattern: String,
        /// Parser message
        message: String,
    },
    /// Image could not be processed
    #[error("image error in {}: {message}", .path.display())]
    Image {
        /// Image file
        path: PathBuf,
        /// What went wrong
        message: String,
    },
    /// Dev server failure
    #[error("server error: {0}")]
    Server(String),
    /// Watcher failure
    #[error("watch error: {0}")]
    Watch(String),
}

impl TaskError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        TaskError::Io { path: path.as_ref().to_path_buf(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display_with_location() {
        let error = CompileError::with_location("app/scss/style.scss", 3, 7, "expected \";\"");
        assert_eq!(error.to_string(), "app/scss/style.scss:3:7: expected \";\"");
    }

    #[test]
    fn test_compile_error_display_without_location() {
        let error = CompileError::new("app/js/main.js", "Unexpected token");
        assert_eq!(error.to_string(), "app/js/main.js: Unexpected token");
    }

    #[test]
    fn test_task_error_io_names_path() {
        let error = TaskError::io(
            "dist/css",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let display = error.to_string();
        assert!(display.contains("dist/css"));
        assert!(display.contains("denied"));
    }

    #[test]
    fn test_task_error_missing_source() {
        let error = TaskError::MissingSource(PathBuf::from("node_modules/reset.css/reset.css"));
        assert_eq!(error.to_string(), "File not found: node_modules/reset.css/reset.css");
    }
}
