//! Single task command.

use anyhow::Result;
use kiln_pipeline::{LogNotifier, Mode, Orchestrator, TaskKind};

use crate::config::Project;

/// Run one asset task without cleaning.
pub async fn run(project: &Project, task: TaskKind, mode: Option<Mode>) -> Result<()> {
    let config = project.build_config(mode, Mode::Production);

    let report = Orchestrator::new(&config, &LogNotifier).run_task(task)?;

    tracing::info!(
        "[{}] wrote {} file(s) in {}ms",
        task,
        report.outputs.len(),
        report.duration_ms
    );

    Ok(())
}
