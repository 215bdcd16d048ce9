//! Task model and execution for assetflow
//!
//! Provides the named tasks, the context they run in, and the two
//! compositions built from them.
//!
//! # Overview
//!
//! - **Tasks**: [`TaskKind`] names every task the CLI can invoke
//! - **Context**: [`TaskContext`] carries configuration, paths and the
//!   live-reload sink
//! - **Execution**: [`TaskRunner`] runs tasks and compositions and reports
//!   [`TaskResult`] / [`BuildResult`]
//!
//! # Example
//!
//! ```ignore
//! use assetflow::build::{TaskContext, TaskRunner};
//! use assetflow::config::load_config;
//!
//! let config = load_config(None)?;
//! let runner = TaskRunner::new(TaskContext::new(config, project_root));
//!
//! let result = runner.release().await;
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod pipeline;
pub mod result;
pub mod task;

pub use context::*;
pub use discovery::*;
pub use pipeline::*;
pub use result::*;
pub use task::*;
