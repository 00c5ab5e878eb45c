//! Task execution utilities with automatic logging
//!
//! A task is one independently failing unit of a phase: one project, one
//! sub-topic, one timeline assignment.

use anyhow::Result;
use std::future::Future;
use org_synth_sdk::{log_error, log_task_complete, log_task_failed, log_task_start};

/// Context provided to each task of a phase
#[derive(Debug, Clone, Copy)]
pub struct TaskContext {
    /// Phase number (for logging)
    pub phase: usize,
    /// Task number (1-indexed for display)
    pub task_number: usize,
    /// Total number of tasks in this phase
    pub total_tasks: usize,
}

impl TaskContext {
    pub fn new(phase: usize, task_number: usize, total_tasks: usize) -> Self {
        Self {
            phase,
            task_number,
            total_tasks,
        }
    }
}

/// Execute a single task with automatic logging
///
/// Wraps task execution with:
/// - `log_task_start` before execution
/// - `log_task_complete` on success
/// - `log_task_failed` on error
///
/// The executor returns the result together with a one-line summary.
/// Errors are returned unchanged; whether a failed task stops the phase is
/// up to the caller.
pub async fn execute_task<F, Fut, R>(
    task_id: impl Into<String>,
    description: impl Into<String>,
    ctx: TaskContext,
    executor: F,
) -> Result<R>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(R, String)>>,
{
    let task_id = task_id.into();
    let description = description.into();

    log_task_start!(ctx.phase, &task_id, &description, ctx.total_tasks);

    match executor().await {
        Ok((result, summary)) => {
            log_task_complete!(&task_id, summary);
            Ok(result)
        }
        Err(e) => {
            log_task_failed!(&task_id, format!("{:#}", e));
            log_error!(
                "[{}/{}] {} failed: {:#}",
                ctx.task_number,
                ctx.total_tasks,
                task_id,
                e
            );
            Err(e)
        }
    }
}
