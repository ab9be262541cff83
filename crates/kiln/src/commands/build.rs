//! Full build command.

use anyhow::{bail, Result};
use kiln_pipeline::{LogNotifier, Mode, Orchestrator};

use crate::config::Project;

/// Run the build command.
pub async fn run(project: &Project, mode: Option<Mode>) -> Result<()> {
    let config = project.build_config(mode, Mode::Production);

    let summary = Orchestrator::new(&config, &LogNotifier).build()?;

    tracing::info!(
        "Built {} file(s) in {}ms",
        summary.files(),
        summary.duration_ms
    );
    tracing::info!("Output: {}", config.layout.out.display());

    if !summary.is_success() {
        let failed: Vec<_> = summary.failures.iter().map(|(task, _)| task.name()).collect();
        bail!("{} task(s) failed: {}", failed.len(), failed.join(", "));
    }

    Ok(())
}
