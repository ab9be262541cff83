//! Preview server command.

use anyhow::{bail, Result};
use kiln_pipeline::Mode;
use kiln_server::DevServer;

use crate::config::Project;

/// Serve the output directory as-is.
pub async fn run(project: &Project, port: Option<u16>) -> Result<()> {
    let build = project.build_config(None, Mode::Production);

    if !build.layout.out.exists() {
        bail!(
            "Directory not found: {}. Run 'kiln build' first.",
            build.layout.out.display()
        );
    }

    let config = project.server_config(build, port, true, false);
    DevServer::new(config).start().await?;

    Ok(())
}
