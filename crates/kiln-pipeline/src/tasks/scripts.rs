//! Script bundling.

use std::path::PathBuf;

use kiln_script::{BundleError, BundleMode, BundleOptions, Bundler, TranspileRule};

use super::{TaskError, TaskKind};
use crate::config::{BuildConfig, Mode};
use crate::output::write_atomic;

fn bundle_mode(mode: Mode) -> BundleMode {
    match mode {
        Mode::Development => BundleMode::Development,
        Mode::Production => BundleMode::Production,
    }
}

fn task_error(error: BundleError) -> TaskError {
    match error {
        BundleError::Read { path, source } => TaskError::Io { path, source },
        BundleError::Config(message) => TaskError::Config(message),
        other => TaskError::transform(TaskKind::Scripts, other.to_string()),
    }
}

pub(super) fn run(config: &BuildConfig) -> Result<Vec<PathBuf>, TaskError> {
    let layout = &config.layout;
    let entry = layout.script_entry();

    if !entry.is_file() {
        return Err(TaskError::Config(format!(
            "Script entry not found: {}",
            entry.display()
        )));
    }

    let mut options = BundleOptions::new(&layout.root, bundle_mode(config.mode));
    options.rules = vec![Box::new(TranspileRule {
        target: config.script_target.clone(),
        ..TranspileRule::default()
    })];

    let bundle = Bundler::new(options).bundle(&entry).map_err(task_error)?;
    tracing::debug!("Bundled {} module(s)", bundle.modules.len());

    let target = layout.script_output();
    write_atomic(&target, bundle.code).map_err(|e| TaskError::io(&target, e))?;

    Ok(vec![target])
}
