//! Source transforms applied to modules before bundling.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::BundleError;

/// A JS-to-JS transform applied to every module it matches.
pub trait ScriptTransform: Send + Sync {
    /// Transform identifier, used in logs.
    fn name(&self) -> &'static str;

    /// File extensions this transform handles.
    fn extensions(&self) -> &[&'static str];

    /// Whether the transform applies to the module at `path`.
    fn applies_to(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.extensions().contains(&ext)
    }

    /// Transform module source.
    fn transform(&self, source: &str, path: &Path) -> Result<String, BundleError>;
}

/// Lowers modern syntax to an older ECMAScript target.
///
/// Modules under any path component named `exclude` (by default
/// `node_modules`) are left untouched.
#[derive(Debug, Clone)]
pub struct TranspileRule {
    /// Target environment, e.g. `es2015` or `chrome 80`
    pub target: String,

    /// Path component that opts a module out
    pub exclude: String,
}

impl Default for TranspileRule {
    fn default() -> Self {
        Self {
            target: "es2015".to_string(),
            exclude: "node_modules".to_string(),
        }
    }
}

impl ScriptTransform for TranspileRule {
    fn name(&self) -> &'static str {
        "transpile"
    }

    fn extensions(&self) -> &[&'static str] {
        &["js", "mjs"]
    }

    fn applies_to(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.extensions().contains(&ext)
            && !path
                .components()
                .any(|c| c.as_os_str() == self.exclude.as_str())
    }

    fn transform(&self, source: &str, path: &Path) -> Result<String, BundleError> {
        let options = TransformOptions::from_target(&self.target)
            .map_err(|e| BundleError::Config(e.to_string()))?;

        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::unambiguous()).parse();
        if ret.panicked || !ret.errors.is_empty() {
            return Err(BundleError::Parse {
                path: path.to_path_buf(),
                message: join_diagnostics(&ret.errors),
            });
        }

        let mut program = ret.program;
        let scoping = SemanticBuilder::new()
            .build(&program)
            .semantic
            .into_scoping();

        let ret = Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
        if !ret.errors.is_empty() {
            return Err(BundleError::Transform {
                path: path.to_path_buf(),
                message: join_diagnostics(&ret.errors),
            });
        }

        Ok(Codegen::new().build(&program).code)
    }
}

pub(crate) fn join_diagnostics<D: std::fmt::Display>(errors: &[D]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
