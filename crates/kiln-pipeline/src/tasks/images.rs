//! Image and upload optimization.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::TaskError;
use crate::config::{BuildConfig, Selector};
use crate::optimize::{optimize, Format};
use crate::output::{mirror, write_atomic};

/// Optimize one file into `target`. Files that cannot be optimized are
/// copied unchanged.
fn optimize_file(source: &Path, target: &Path) -> Result<(), TaskError> {
    let bytes = fs::read(source).map_err(|e| TaskError::io(source, e))?;

    let optimized = match optimize(Format::from_path(source), &bytes) {
        Ok(optimized) => optimized,
        Err(e) => {
            tracing::warn!("Copying {} unoptimized: {}", source.display(), e);
            bytes
        }
    };

    write_atomic(target, optimized).map_err(|e| TaskError::io(target, e))
}

/// Optimize every file of `selector` into `out`, keeping paths relative to
/// `base`.
fn optimize_tree(selector: &Selector, base: &Path, out: &Path) -> Result<Vec<PathBuf>, TaskError> {
    let results: Vec<Result<PathBuf, TaskError>> = selector
        .files()
        .par_iter()
        .map(|file| {
            let target = mirror(file, base, out);
            optimize_file(file, &target)?;
            Ok(target)
        })
        .collect();

    results.into_iter().collect()
}

pub(super) fn run_images(config: &BuildConfig) -> Result<Vec<PathBuf>, TaskError> {
    let layout = &config.layout;
    let selector = layout.images();
    optimize_tree(&selector, &selector.dir, &layout.images_output())
}

pub(super) fn run_uploads(config: &BuildConfig) -> Result<Vec<PathBuf>, TaskError> {
    let layout = &config.layout;
    optimize_tree(&layout.uploads(), &layout.src, &layout.out)
}
