use anyhow::Result;
use kiln_pipeline::clean;

use crate::config::Project;

/// Run the clean command.
pub async fn run(project: &Project) -> Result<()> {
    let out = kiln_pipeline::Layout::new(&project.root).out;
    let removed = clean(&out)?;

    tracing::info!("Removed {} entries from {}", removed, out.display());

    Ok(())
}
