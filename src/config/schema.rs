//! Configuration schema types for `assetflow.toml`
//!
//! Defines the structure and validation rules for an asset project. Every
//! section has defaults matching the conventional `app/` + `dist/` layout, so
//! an empty file (or no file at all) describes a working project.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,
    /// Working tree (authored sources plus compiled dev output)
    #[serde(default = "default_app")]
    pub app: PathBuf,
    /// Release tree
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
}

fn default_name() -> String {
    "site".to_string()
}

fn default_app() -> PathBuf {
    PathBuf::from("app")
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { name: default_name(), app: default_app(), dist: default_dist() }
    }
}

/// Style build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Entry stylesheet
    #[serde(default = "default_style_entry")]
    pub entry: PathBuf,
    /// Directory receiving the compiled stylesheet
    #[serde(default = "default_style_out_dir")]
    pub out_dir: PathBuf,
    /// File name of the compiled stylesheet
    #[serde(default = "default_style_output")]
    pub output: String,
    /// Browserslist queries used for vendor prefixing
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    /// Extra directories searched for `@use` / `@import`
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
    /// Write `maps/<output>.map` next to the stylesheet
    #[serde(default = "default_true")]
    pub sourcemaps: bool,
}

fn default_style_entry() -> PathBuf {
    PathBuf::from("app/scss/style.scss")
}

fn default_style_out_dir() -> PathBuf {
    PathBuf::from("app/css")
}

fn default_style_output() -> String {
    "style.min.css".to_string()
}

fn default_browsers() -> Vec<String> {
    vec!["last 10 versions".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: default_style_entry(),
            out_dir: default_style_out_dir(),
            output: default_style_output(),
            browsers: default_browsers(),
            load_paths: vec![],
            sourcemaps: true,
        }
    }
}

/// Script build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Ordered entry patterns; a leading `!` excludes matches
    #[serde(default = "default_script_entries")]
    pub entries: Vec<String>,
    /// Directory receiving the combined script
    #[serde(default = "default_script_out_dir")]
    pub out_dir: PathBuf,
    /// File name of the combined script
    #[serde(default = "default_script_output")]
    pub output: String,
    /// Language level the output is transpiled to (e.g. "es2015")
    #[serde(default = "default_script_target")]
    pub target: String,
    /// Compress and mangle the output
    #[serde(default = "default_true")]
    pub minify: bool,
    /// Write `maps/<output>.map` next to the script
    #[serde(default = "default_true")]
    pub sourcemaps: bool,
}

fn default_script_entries() -> Vec<String> {
    vec!["app/js/main.js".to_string()]
}

fn default_script_out_dir() -> PathBuf {
    PathBuf::from("app/js")
}

fn default_script_output() -> String {
    "main.min.js".to_string()
}

fn default_script_target() -> String {
    "es2015".to_string()
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            entries: default_script_entries(),
            out_dir: default_script_out_dir(),
            output: default_script_output(),
            target: default_script_target(),
            minify: true,
            sourcemaps: true,
        }
    }
}

/// SVG minification options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvgConfig {
    /// Drop the root `viewBox` when it duplicates `width`/`height`
    #[serde(default = "default_true")]
    pub remove_viewbox: bool,
    /// Remove `id` attributes that nothing references
    #[serde(default)]
    pub cleanup_ids: bool,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self { remove_viewbox: true, cleanup_ids: false }
    }
}

/// Image compression settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Source images directory (walked recursively)
    #[serde(default = "default_images_src")]
    pub src: PathBuf,
    /// Output directory for compressed images
    #[serde(default = "default_images_dest")]
    pub dest: PathBuf,
    /// Request interlaced GIF output
    #[serde(default = "default_true")]
    pub gif_interlaced: bool,
    /// JPEG re-encode quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Request progressive JPEG output
    #[serde(default = "default_true")]
    pub jpeg_progressive: bool,
    /// PNG optimization level (0-7)
    #[serde(default = "default_png_level")]
    pub png_level: u8,
    /// SVG minification
    #[serde(default)]
    pub svg: SvgConfig,
}

fn default_images_src() -> PathBuf {
    PathBuf::from("app/images")
}

fn default_images_dest() -> PathBuf {
    PathBuf::from("dist/images")
}

fn default_jpeg_quality() -> u8 {
    75
}

fn default_png_level() -> u8 {
    5
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            src: default_images_src(),
            dest: default_images_dest(),
            gif_interlaced: true,
            jpeg_quality: default_jpeg_quality(),
            jpeg_progressive: true,
            png_level: default_png_level(),
            svg: SvgConfig::default(),
        }
    }
}

/// Third-party stylesheet aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibsConfig {
    /// Library stylesheets, concatenated in order
    #[serde(default = "default_lib_sources")]
    pub sources: Vec<String>,
    /// Generated partial imported by the entry stylesheet
    #[serde(default = "default_lib_output")]
    pub output: PathBuf,
}

fn default_lib_sources() -> Vec<String> {
    vec!["node_modules/reset.css/reset.css".to_string()]
}

fn default_lib_output() -> PathBuf {
    PathBuf::from("app/scss/_libs.scss")
}

impl Default for LibsConfig {
    fn default() -> Self {
        Self { sources: default_lib_sources(), output: default_lib_output() }
    }
}

/// Development server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory served as the site root
    #[serde(default = "default_app")]
    pub root: PathBuf,
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { root: default_app(), host: default_host(), port: default_port() }
    }
}

/// What a watch rule does when one of its files changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchAction {
    /// Rebuild the stylesheet
    Styles,
    /// Rebuild the combined script
    Scripts,
    /// Tell connected browsers to reload
    Reload,
}

impl std::fmt::Display for WatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchAction::Styles => write!(f, "styles"),
            WatchAction::Scripts => write!(f, "scripts"),
            WatchAction::Reload => write!(f, "reload"),
        }
    }
}

/// A set of watched patterns bound to one action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchRuleConfig {
    /// Glob patterns relative to the project root
    pub patterns: Vec<String>,
    /// Patterns that are never acted on even if they match
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Action to run
    pub action: WatchAction,
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
    /// Watch rules, evaluated for every changed path
    #[serde(default = "default_watch_rules")]
    pub rules: Vec<WatchRuleConfig>,
}

fn default_debounce_ms() -> u32 {
    100
}

fn default_watch_rules() -> Vec<WatchRuleConfig> {
    vec![
        WatchRuleConfig {
            patterns: vec!["app/scss/**/*.scss".to_string()],
            exclude: vec![],
            action: WatchAction::Styles,
        },
        WatchRuleConfig {
            patterns: vec!["app/js/**/*.js".to_string()],
            exclude: vec!["app/js/main.min.js".to_string()],
            action: WatchAction::Scripts,
        },
        WatchRuleConfig {
            patterns: vec!["app/*.html".to_string()],
            exclude: vec![],
            action: WatchAction::Reload,
        },
    ]
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false, rules: default_watch_rules() }
    }
}

/// Release assembly settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Files copied into the release tree
    #[serde(default = "default_release_sources")]
    pub sources: Vec<String>,
    /// Prefix stripped from each copied path
    #[serde(default = "default_app")]
    pub base: PathBuf,
}

fn default_release_sources() -> Vec<String> {
    vec![
        "app/css/style.min.css".to_string(),
        "app/fonts/**/*".to_string(),
        "app/js/main.min.js".to_string(),
        "app/*.html".to_string(),
    ]
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self { sources: default_release_sources(), base: default_app() }
    }
}

/// Complete assetflow.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Project metadata
    #[serde(default)]
    pub project: ProjectConfig,
    /// Style build
    #[serde(default)]
    pub styles: StylesConfig,
    /// Script build
    #[serde(default)]
    pub scripts: ScriptsConfig,
    /// Image compression
    #[serde(default)]
    pub images: ImagesConfig,
    /// Library aggregation
    #[serde(default)]
    pub libs: LibsConfig,
    /// Development server
    #[serde(default)]
    pub server: ServerConfig,
    /// Watch mode
    #[serde(default)]
    pub watch: WatchConfig,
    /// Release assembly
    #[serde(default)]
    pub release: ReleaseConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "images.jpeg_quality")
    pub field: String,
    /// Error message
    pub message: String,
}

impl ConfigValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "assetflow.toml: '{}' {}", self.field, self.message)
    }
}

impl AssetConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.name.trim().is_empty() {
            errors.push(ConfigValidationError::new("project.name", "must be a non-empty string"));
        }

        if self.styles.output.is_empty() {
            errors.push(ConfigValidationError::new("styles.output", "must be a file name"));
        }
        if self.styles.browsers.iter().all(|q| q.trim().is_empty()) {
            errors.push(ConfigValidationError::new(
                "styles.browsers",
                "must contain at least one browserslist query",
            ));
        }

        if !self.scripts.entries.iter().any(|e| !e.starts_with('!')) {
            errors.push(ConfigValidationError::new(
                "scripts.entries",
                "must contain at least one non-excluding pattern",
            ));
        }
        if self.scripts.output.is_empty() {
            errors.push(ConfigValidationError::new("scripts.output", "must be a file name"));
        }

        if !(1..=100).contains(&self.images.jpeg_quality) {
            errors.push(ConfigValidationError::new(
                "images.jpeg_quality",
                "must be between 1 and 100",
            ));
        }
        if self.images.png_level > 7 {
            errors.push(ConfigValidationError::new("images.png_level", "must be between 0 and 7"));
        }

        if self.server.port == 0 {
            errors.push(ConfigValidationError::new("server.port", "must be a non-zero port"));
        }

        for (i, rule) in self.watch.rules.iter().enumerate() {
            if rule.patterns.is_empty() {
                errors.push(ConfigValidationError::new(
                    format!("watch.rules[{}].patterns", i),
                    "must contain at least one glob pattern",
                ));
            }
            for pattern in rule.patterns.iter().chain(rule.exclude.iter()) {
                if let Err(e) = glob::Pattern::new(pattern) {
                    errors.push(ConfigValidationError::new(
                        format!("watch.rules[{}]", i),
                        format!("has invalid pattern '{}': {}", pattern, e),
                    ));
                }
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
