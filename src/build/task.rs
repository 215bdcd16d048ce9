//! Named task definitions.
//!
//! Every task the CLI can invoke has a [`TaskKind`]. Compositions are lists of
//! kinds run either in sequence or concurrently.

use std::str::FromStr;

/// A named task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Concatenate third-party stylesheets into the SCSS partial
    CssLibs,
    /// Compile, prefix and minify the entry stylesheet
    Styles,
    /// Concatenate, transpile and minify scripts
    Scripts,
    /// Compress images into the release tree
    Images,
    /// Serve the working tree with live reload
    Browser,
    /// Watch sources and rebuild on change
    Watching,
    /// Delete the release tree
    CleanDist,
    /// Copy built files into the release tree
    Assemble,
}

/// Tasks of the `build` composition, in order.
pub const RELEASE_SEQUENCE: [TaskKind; 3] = [TaskKind::CleanDist, TaskKind::Images, TaskKind::Assemble];

/// Tasks of the `default` composition, run together.
pub const DEVELOPMENT_SET: [TaskKind; 5] = [
    TaskKind::CssLibs,
    TaskKind::Styles,
    TaskKind::Scripts,
    TaskKind::Browser,
    TaskKind::Watching,
];

impl TaskKind {
    /// All task kinds.
    pub const ALL: [TaskKind; 8] = [
        TaskKind::CssLibs,
        TaskKind::Styles,
        TaskKind::Scripts,
        TaskKind::Images,
        TaskKind::Browser,
        TaskKind::Watching,
        TaskKind::CleanDist,
        TaskKind::Assemble,
    ];

    /// The task's public name.
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::CssLibs => "cssLibs",
            TaskKind::Styles => "styles",
            TaskKind::Scripts => "scripts",
            TaskKind::Images => "images",
            TaskKind::Browser => "browser",
            TaskKind::Watching => "watching",
            TaskKind::CleanDist => "cleanDist",
            TaskKind::Assemble => "assemble",
        }
    }

    /// Whether the task runs until the process exits.
    pub fn is_long_running(self) -> bool {
        matches!(self, TaskKind::Browser | TaskKind::Watching)
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unknown task name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTask(pub String);

impl std::fmt::Display for UnknownTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = TaskKind::ALL.iter().map(|k| k.name()).collect();
        write!(f, "Unknown task '{}'. Available tasks: {}", self.0, names.join(", "))
    }
}

impl std::error::Error for UnknownTask {}

impl FromStr for TaskKind {
    type Err = UnknownTask;

    /// Accepts the camelCase names and their kebab-case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cssLibs" | "css-libs" => Ok(TaskKind::CssLibs),
            "styles" => Ok(TaskKind::Styles),
            "scripts" => Ok(TaskKind::Scripts),
            "images" => Ok(TaskKind::Images),
            "browser" => Ok(TaskKind::Browser),
            "watching" => Ok(TaskKind::Watching),
            "cleanDist" | "clean-dist" => Ok(TaskKind::CleanDist),
            "assemble" => Ok(TaskKind::Assemble),
            _ => Err(UnknownTask(s.to_string())),
        }
    }
}
