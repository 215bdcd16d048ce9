//! Command-line interface implementation
//!
//! Parses arguments, loads the project configuration and dispatches the named
//! task or composition on a single-threaded tokio runtime.

mod init;

pub use init::{init_project, InitError};

use crate::build::{BuildResult, TaskContext, TaskKind, TaskRunner};
use crate::config::{
    default_config, find_config_from, load_config, loader::find_xdg_config, merge_cli_overrides,
    project_root, AssetConfig, CliOverrides,
};
use crate::reload::LiveReload;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Assetflow - compile styles and scripts, compress images, serve with live reload
#[derive(Parser)]
#[command(name = "assetflow")]
#[command(about = "Assetflow - frontend asset pipeline with a live-reload dev server")]
#[command(version)]
pub struct Cli {
    /// Path to assetflow.toml (default: search upward from the project root)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root (default: the directory holding assetflow.toml)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Release tree, overriding `project.dist`
    #[arg(long, global = true)]
    pub dist: Option<PathBuf>,

    /// Skip source maps for styles and scripts
    #[arg(long, global = true)]
    pub no_sourcemaps: bool,

    /// Log file-level detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Task to run (default: the development composition)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Concatenate third-party stylesheets into the SCSS partial
    #[command(name = "cssLibs", alias = "css-libs")]
    CssLibs,

    /// Compile, prefix and minify the entry stylesheet
    Styles,

    /// Concatenate, transpile and minify scripts
    Scripts,

    /// Compress images into the release tree
    Images,

    /// Watch sources and rebuild on change
    Watching,

    /// Serve the working tree with live reload
    Browser {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,
    },

    /// Delete the release tree
    #[command(name = "cleanDist", alias = "clean-dist")]
    CleanDist,

    /// Copy built files into the release tree
    Assemble,

    /// Release composition: cleanDist, images, assemble
    Build,

    /// Development composition: cssLibs, styles, scripts, browser, watching
    Default,

    /// Write a starter assetflow.toml
    Init {
        /// Directory to initialize
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

/// What the command asks the runner to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Invocation {
    Task(TaskKind),
    Release,
    Development,
}

impl Invocation {
    fn from_command(command: Option<&Commands>) -> Option<Self> {
        let invocation = match command {
            None | Some(Commands::Default) => Invocation::Development,
            Some(Commands::Build) => Invocation::Release,
            Some(Commands::CssLibs) => Invocation::Task(TaskKind::CssLibs),
            Some(Commands::Styles) => Invocation::Task(TaskKind::Styles),
            Some(Commands::Scripts) => Invocation::Task(TaskKind::Scripts),
            Some(Commands::Images) => Invocation::Task(TaskKind::Images),
            Some(Commands::Watching) => Invocation::Task(TaskKind::Watching),
            Some(Commands::Browser { .. }) => Invocation::Task(TaskKind::Browser),
            Some(Commands::CleanDist) => Invocation::Task(TaskKind::CleanDist),
            Some(Commands::Assemble) => Invocation::Task(TaskKind::Assemble),
            Some(Commands::Init { .. }) => return None,
        };
        Some(invocation)
    }

    /// Whether a dev server may be listening for reload events.
    fn needs_live_reload(self) -> bool {
        match self {
            Invocation::Task(kind) => kind.is_long_running(),
            Invocation::Release => false,
            Invocation::Development => true,
        }
    }
}

/// Initialize tracing output.
///
/// `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: bool) {
    let default = if verbose { "assetflow=debug,tower_http=debug" } else { "assetflow=info" };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn overrides(cli: &Cli) -> CliOverrides {
    let (port, host) = match &cli.command {
        Some(Commands::Browser { port, host }) => (*port, host.clone()),
        _ => (None, None),
    };
    CliOverrides {
        port,
        host,
        dist: cli.dist.clone(),
        sourcemaps: if cli.no_sourcemaps { Some(false) } else { None },
    }
}

/// Load the configuration and decide the project root.
///
/// An explicit `--config` is loaded as given. Otherwise the search walks up
/// from `--root` (or the current directory), then falls back to the user
/// config directory, then to the defaults.
fn load_project(cli: &Cli) -> Result<(AssetConfig, PathBuf), String> {
    let cwd = std::env::current_dir().map_err(|e| format!("Error: {}", e))?;
    let start = cli.root.clone().unwrap_or_else(|| cwd.clone());

    let (config_path, root) = match &cli.config {
        Some(path) => (Some(path.clone()), cli.root.clone().or_else(|| parent_dir(path))),
        None => match find_config_from(start.clone()) {
            Some(path) => {
                let root = cli.root.clone().or_else(|| parent_dir(&path));
                (Some(path), root)
            }
            None => (find_xdg_config(), Some(start)),
        },
    };

    let mut config = match &config_path {
        Some(path) => load_config(Some(path)).map_err(|e| format!("Error: {}", e))?,
        None => default_config(),
    };
    merge_cli_overrides(&mut config, &overrides(cli));

    let root = root.unwrap_or(cwd);
    Ok((config, root))
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    project_root(path)
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
        .map(Path::to_path_buf)
}

/// Run the CLI application.
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_INVALID_ARGS } else { EXIT_SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.verbose);

    let invocation = match Invocation::from_command(cli.command.as_ref()) {
        Some(invocation) => invocation,
        None => return run_init(&cli),
    };

    let (config, root) = match load_project(&cli) {
        Ok(loaded) => loaded,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    tracing::debug!("project root: {}", root.display());

    let mut context = TaskContext::new(config, root).with_verbose(cli.verbose);
    if invocation.needs_live_reload() {
        context = context.with_live_reload(LiveReload::new());
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let runner = TaskRunner::new(context);
    let result = runtime.block_on(dispatch(&runner, invocation));
    report(&result)
}

async fn dispatch(runner: &TaskRunner, invocation: Invocation) -> BuildResult {
    match invocation {
        Invocation::Task(kind) => runner.run_one(kind).await,
        Invocation::Release => runner.release().await,
        Invocation::Development => runner.development().await,
    }
}

fn report(result: &BuildResult) -> ExitCode {
    if result.is_success() {
        println!("{}", result.summary());
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{}", result.summary());
        ExitCode::from(EXIT_ERROR)
    }
}

fn run_init(cli: &Cli) -> ExitCode {
    let dir = match &cli.command {
        Some(Commands::Init { dir }) => dir,
        _ => return ExitCode::from(EXIT_INVALID_ARGS),
    };

    match init_project(dir) {
        Ok(path) => {
            println!("Created {}", path.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("assetflow").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_command_is_development() {
        let cli = parse(&[]);
        assert_eq!(
            Invocation::from_command(cli.command.as_ref()),
            Some(Invocation::Development)
        );
    }

    #[test]
    fn test_task_names_and_aliases() {
        for (args, kind) in [
            (&["cssLibs"][..], TaskKind::CssLibs),
            (&["css-libs"][..], TaskKind::CssLibs),
            (&["cleanDist"][..], TaskKind::CleanDist),
            (&["clean-dist"][..], TaskKind::CleanDist),
            (&["styles"][..], TaskKind::Styles),
            (&["assemble"][..], TaskKind::Assemble),
        ] {
            let cli = parse(args);
            assert_eq!(
                Invocation::from_command(cli.command.as_ref()),
                Some(Invocation::Task(kind)),
                "{:?}",
                args
            );
        }
    }

    #[test]
    fn test_build_is_release() {
        let cli = parse(&["build"]);
        let invocation = Invocation::from_command(cli.command.as_ref()).unwrap();
        assert_eq!(invocation, Invocation::Release);
        assert!(!invocation.needs_live_reload());
    }

    #[test]
    fn test_live_reload_only_for_long_running() {
        assert!(Invocation::Development.needs_live_reload());
        assert!(Invocation::Task(TaskKind::Browser).needs_live_reload());
        assert!(Invocation::Task(TaskKind::Watching).needs_live_reload());
        assert!(!Invocation::Task(TaskKind::Styles).needs_live_reload());
    }

    #[test]
    fn test_browser_overrides() {
        let cli = parse(&["browser", "--port", "8080", "--host", "0.0.0.0"]);
        let overrides = overrides(&cli);
        assert_eq!(overrides.port, Some(8080));
        assert_eq!(overrides.host.as_deref(), Some("0.0.0.0"));
    }

    #[test]
    fn test_global_overrides() {
        let cli = parse(&["build", "--dist", "public", "--no-sourcemaps"]);
        let overrides = overrides(&cli);
        assert_eq!(overrides.dist, Some(PathBuf::from("public")));
        assert_eq!(overrides.sourcemaps, Some(false));
        assert_eq!(overrides.port, None);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["assetflow", "deploy"]).is_err());
    }

    #[test]
    fn test_load_project_with_explicit_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("assetflow.toml");
        std::fs::write(&path, "[project]\nname = \"demo\"\n\n[server]\nport = 4000\n").unwrap();

        let cli = parse(&["--config", path.to_str().unwrap(), "browser", "--port", "5000"]);
        let (config, root) = load_project(&cli).unwrap();

        assert_eq!(config.project.name, "demo");
        assert_eq!(config.server.port, 5000);
        assert_eq!(root, temp.path());
    }

    #[test]
    fn test_load_project_invalid_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("assetflow.toml");
        std::fs::write(&path, "[server]\nport = 0\n").unwrap();

        let cli = parse(&["--config", path.to_str().unwrap(), "styles"]);
        assert!(load_project(&cli).is_err());
    }
}
