//! Failure reporting for asset tasks.

use crate::tasks::{TaskError, TaskKind, TaskReport};

/// Receives task outcomes from the orchestrator and the watch loop.
pub trait Notifier: Send + Sync {
    /// A task failed. Called for every failure, recoverable or not.
    fn task_failed(&self, task: TaskKind, error: &TaskError);

    /// A task finished successfully.
    fn task_finished(&self, _report: &TaskReport) {}
}

/// Notifier that writes to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn task_failed(&self, task: TaskKind, error: &TaskError) {
        tracing::error!("[{}] {}", task, error);
    }

    fn task_finished(&self, report: &TaskReport) {
        tracing::debug!(
            "[{}] {} file(s) in {}ms",
            report.task,
            report.outputs.len(),
            report.duration_ms
        );
    }
}
