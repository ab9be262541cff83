//! Development server command.

use anyhow::Result;
use kiln_pipeline::{LogNotifier, Mode, Orchestrator};
use kiln_server::DevServer;

use crate::config::Project;

/// Run the dev server. With `initial_build` the output is rebuilt first.
pub async fn run(
    project: &Project,
    port: Option<u16>,
    open: bool,
    mode: Option<Mode>,
    initial_build: bool,
) -> Result<()> {
    let build = project.build_config(mode, Mode::Development);

    if initial_build {
        let summary = Orchestrator::new(&build, &LogNotifier).build()?;
        tracing::info!(
            "Built {} file(s) in {}ms",
            summary.files(),
            summary.duration_ms
        );
        if !summary.is_success() {
            tracing::warn!(
                "{} task(s) failed, watching anyway",
                summary.failures.len()
            );
        }
    }

    let config = project.server_config(build, port, open, true);
    tracing::info!("Starting development server on port {}", config.port);

    DevServer::new(config).start().await?;

    Ok(())
}
