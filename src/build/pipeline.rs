//! Task execution and the two compositions.
//!
//! [`TaskRunner`] runs any named task against one [`TaskContext`] and turns
//! its outcome into a [`TaskResult`]. The release composition awaits each
//! stage before the next and stops at the first failure; the development
//! composition starts all of its tasks together and lets each fail alone.

use crate::build::{
    format_duration, BuildResult, TaskContext, TaskKind, TaskResult, DEVELOPMENT_SET,
    RELEASE_SEQUENCE,
};
use crate::error::TaskError;
use crate::images::{ImageOutcome, ImageReport};
use crate::{images, libs, release, scripts, server, styles, watch};
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

/// What a successful task produced.
#[derive(Debug, Clone, Default)]
pub struct TaskOutput {
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Non-fatal problems
    pub warnings: Vec<String>,
}

impl From<Vec<PathBuf>> for TaskOutput {
    fn from(outputs: Vec<PathBuf>) -> Self {
        Self { outputs, warnings: vec![] }
    }
}

impl From<Vec<ImageReport>> for TaskOutput {
    fn from(reports: Vec<ImageReport>) -> Self {
        let warnings = reports
            .iter()
            .filter_map(|r| match &r.outcome {
                ImageOutcome::Failed(message) => {
                    Some(format!("{}: {} (copied unchanged)", r.source.display(), message))
                }
                _ => None,
            })
            .collect();
        let outputs = reports.into_iter().map(|r| r.output).collect();
        Self { outputs, warnings }
    }
}

/// Await a task, time it, log it and record the outcome.
pub async fn record<F>(kind: TaskKind, task: F) -> TaskResult
where
    F: Future<Output = Result<TaskOutput, TaskError>>,
{
    tracing::info!("Starting '{}'...", kind);
    let start = Instant::now();
    let outcome = task.await;
    let duration = start.elapsed();

    match outcome {
        Ok(output) => {
            tracing::info!("Finished '{}' after {}", kind, format_duration(duration));
            TaskResult::success(kind, output.outputs, duration).with_warnings(output.warnings)
        }
        Err(e) => {
            tracing::error!("'{}' errored after {}: {}", kind, format_duration(duration), e);
            TaskResult::failed(kind, e.to_string(), duration)
        }
    }
}

/// Run one task to completion.
///
/// `browser` and `watching` only return if they fail to start.
async fn execute(kind: TaskKind, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
    match kind {
        TaskKind::CssLibs => libs::aggregate_libs(ctx).await.map(TaskOutput::from),
        TaskKind::Styles => styles::build_styles(ctx).await.map(TaskOutput::from),
        TaskKind::Scripts => scripts::build_scripts(ctx).await.map(TaskOutput::from),
        TaskKind::Images => images::compress_images(ctx).await.map(TaskOutput::from),
        TaskKind::Browser => server::serve(ctx)
            .await
            .map(|()| TaskOutput::default())
            .map_err(|e| TaskError::Server(e.to_string())),
        TaskKind::Watching => watch::watch(ctx)
            .await
            .map(|()| TaskOutput::default())
            .map_err(|e| TaskError::Watch(e.to_string())),
        TaskKind::CleanDist => release::clean_dist(ctx).await.map(TaskOutput::from),
        TaskKind::Assemble => release::assemble(ctx).await.map(TaskOutput::from),
    }
}

/// Runs named tasks and compositions against one context.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    context: TaskContext,
}

impl TaskRunner {
    /// Create a runner.
    pub fn new(context: TaskContext) -> Self {
        Self { context }
    }

    /// Get the context.
    pub fn context(&self) -> &TaskContext {
        &self.context
    }

    /// Run a single task.
    pub async fn run(&self, kind: TaskKind) -> TaskResult {
        record(kind, execute(kind, &self.context)).await
    }

    /// Run a single task as a one-entry composition.
    pub async fn run_one(&self, kind: TaskKind) -> BuildResult {
        let start = Instant::now();
        let mut result = BuildResult::new();
        result.add_result(self.run(kind).await);
        result.with_duration(start.elapsed())
    }

    /// Release composition: clean, compress images, assemble.
    ///
    /// Each stage is awaited before the next starts. The first failure stops
    /// the sequence; the result holds the stages that ran.
    pub async fn release(&self) -> BuildResult {
        let start = Instant::now();
        let mut result = BuildResult::new();

        for kind in RELEASE_SEQUENCE {
            let stage = self.run(kind).await;
            let failed = !stage.is_success();
            result.add_result(stage);
            if failed {
                break;
            }
        }

        result.with_duration(start.elapsed())
    }

    /// Development composition: libraries, styles, scripts, dev server and
    /// watcher, all started together.
    ///
    /// A failing task is logged and does not cancel the others, so this
    /// returns only once the server and the watcher have both stopped.
    pub async fn development(&self) -> BuildResult {
        let start = Instant::now();
        let [first, second, third, fourth, fifth] = DEVELOPMENT_SET;

        let results = tokio::join!(
            self.run(first),
            self.run(second),
            self.run(third),
            self.run(fourth),
            self.run(fifth),
        );

        let mut result = BuildResult::new();
        result.add_result(results.0);
        result.add_result(results.1);
        result.add_result(results.2);
        result.add_result(results.3);
        result.add_result(results.4);
        result.with_duration(start.elapsed())
    }
}
