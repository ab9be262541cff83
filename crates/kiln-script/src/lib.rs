//! Script bundling for kiln.
//!
//! Walks the module graph from an entry file, rewrites ES module syntax into
//! a small module registry, applies transpilation rules, and emits a single
//! script. Development bundles keep every module readable behind `eval` with
//! a `sourceURL`; production bundles are minified and mangled.

pub mod bundler;
pub mod generator;
pub mod module;
pub mod resolve;
pub mod transform;

pub use bundler::{Bundle, BundleMode, BundleOptions, Bundler};
pub use module::{rewrite_module, RewrittenModule};
pub use resolve::Resolver;
pub use transform::{ScriptTransform, TranspileRule};

use std::path::PathBuf;

/// Errors that can occur while bundling.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Syntax error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Cannot resolve '{request}' from {from}")]
    Resolve { request: String, from: PathBuf },

    #[error("Failed to transform {path}: {message}")]
    Transform { path: PathBuf, message: String },

    #[error("Invalid bundler configuration: {0}")]
    Config(String),
}
