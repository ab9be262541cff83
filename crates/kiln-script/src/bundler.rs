//! Module graph traversal.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::{minify_bundle, render_bundle};
use crate::module::{json_module, rewrite_module};
use crate::resolve::Resolver;
use crate::transform::{ScriptTransform, TranspileRule};
use crate::BundleError;

/// Output flavor of a bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BundleMode {
    /// Readable modules evaluated with a `sourceURL` each
    #[default]
    Development,

    /// Minified and mangled, no source maps
    Production,
}

/// Bundler configuration.
pub struct BundleOptions {
    /// Directory module ids are relative to
    pub root: PathBuf,

    /// Output flavor
    pub mode: BundleMode,

    /// Transforms applied to each module they match, in order
    pub rules: Vec<Box<dyn ScriptTransform>>,
}

impl BundleOptions {
    /// Options with the default transpilation rule.
    pub fn new(root: impl Into<PathBuf>, mode: BundleMode) -> Self {
        Self {
            root: root.into(),
            mode,
            rules: vec![Box::new(TranspileRule::default())],
        }
    }
}

impl std::fmt::Debug for BundleOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleOptions")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// One module in the bundle.
#[derive(Debug, Clone)]
pub struct Module {
    /// Stable id: path relative to the bundle root, `/`-separated
    pub id: String,

    /// Source file
    pub path: PathBuf,

    /// Rewritten module body
    pub code: String,

    /// Specifier to module id
    pub dependencies: BTreeMap<String, String>,
}

/// A finished bundle.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Bundle source
    pub code: String,

    /// Module ids, entry first
    pub modules: Vec<String>,
}

/// Bundles a module graph into one script.
#[derive(Debug)]
pub struct Bundler {
    options: BundleOptions,
    resolver: Resolver,
}

impl Bundler {
    pub fn new(options: BundleOptions) -> Self {
        Self {
            options,
            resolver: Resolver::new(),
        }
    }

    /// Bundle everything reachable from `entry`.
    pub fn bundle(&self, entry: &Path) -> Result<Bundle, BundleError> {
        let modules = self.collect(entry)?;
        let entry_id = modules
            .first()
            .map(|m| m.id.clone())
            .unwrap_or_default();

        let code = render_bundle(&modules, &entry_id, self.options.mode);
        let code = match self.options.mode {
            BundleMode::Development => code,
            BundleMode::Production => minify_bundle(&code)?,
        };

        tracing::debug!("Bundled {} modules from {}", modules.len(), entry.display());

        Ok(Bundle {
            code,
            modules: modules.into_iter().map(|m| m.id).collect(),
        })
    }

    /// Breadth-first walk of the module graph.
    fn collect(&self, entry: &Path) -> Result<Vec<Module>, BundleError> {
        let mut modules: Vec<Module> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();

        if !entry.is_file() {
            return Err(BundleError::Read {
                path: entry.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "entry not found"),
            });
        }

        index.insert(entry.to_path_buf(), 0);
        modules.push(self.placeholder(entry));
        queue.push_back(entry.to_path_buf());

        while let Some(path) = queue.pop_front() {
            let source = fs::read_to_string(&path).map_err(|e| BundleError::Read {
                path: path.clone(),
                source: e,
            })?;

            let rewritten = self.load(&source, &path)?;

            let mut dependencies = BTreeMap::new();
            for request in &rewritten.requests {
                let target = self.resolver.resolve(request, &path)?;
                let target_idx = match index.get(&target) {
                    Some(&i) => i,
                    None => {
                        let i = modules.len();
                        index.insert(target.clone(), i);
                        modules.push(self.placeholder(&target));
                        queue.push_back(target);
                        i
                    }
                };
                dependencies.insert(request.clone(), modules[target_idx].id.clone());
            }

            let idx = index[&path];
            modules[idx].code = rewritten.code;
            modules[idx].dependencies = dependencies;
        }

        Ok(modules)
    }

    fn load(&self, source: &str, path: &Path) -> Result<crate::RewrittenModule, BundleError> {
        if path.extension().is_some_and(|e| e == "json") {
            return json_module(source, path);
        }

        let mut code = source.to_string();
        for rule in &self.options.rules {
            if rule.applies_to(path) {
                code = rule.transform(&code, path)?;
            }
        }

        rewrite_module(&code, path)
    }

    fn placeholder(&self, path: &Path) -> Module {
        Module {
            id: module_id(&self.options.root, path),
            path: path.to_path_buf(),
            code: String::new(),
            dependencies: BTreeMap::new(),
        }
    }
}

fn module_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn project() -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        let js = temp.path().join("src/js");
        fs::create_dir_all(&js).unwrap();
        fs::write(
            js.join("index.js"),
            "import divide from \"./lib.js\";\nimport { VERSION } from \"./meta\";\nconsole.log(divide(4, 2), VERSION);\n",
        )
        .unwrap();
        fs::write(
            js.join("lib.js"),
            "export default function divide(a, b) { return a / b; }\n",
        )
        .unwrap();
        fs::write(js.join("meta.js"), "export const VERSION = \"1.0\";\n").unwrap();
        temp
    }

    #[test]
    fn collects_module_graph() {
        let temp = project();
        let bundler = Bundler::new(BundleOptions::new(temp.path(), BundleMode::Development));

        let bundle = bundler
            .bundle(&temp.path().join("src/js/index.js"))
            .unwrap();

        assert_eq!(
            bundle.modules,
            vec!["src/js/index.js", "src/js/lib.js", "src/js/meta.js"]
        );
    }

    #[test]
    fn development_bundles_use_eval_with_source_urls() {
        let temp = project();
        let bundler = Bundler::new(BundleOptions::new(temp.path(), BundleMode::Development));

        let bundle = bundler
            .bundle(&temp.path().join("src/js/index.js"))
            .unwrap();

        assert!(bundle.code.contains("eval("));
        assert!(bundle.code.contains("//# sourceURL=kiln:///src/js/lib.js"));
        assert!(bundle.code.contains("__kiln_require(\"src/js/index.js\")"));
    }

    #[test]
    fn production_bundles_are_minified() {
        let temp = project();
        let dev = Bundler::new(BundleOptions::new(temp.path(), BundleMode::Development))
            .bundle(&temp.path().join("src/js/index.js"))
            .unwrap();
        let prod = Bundler::new(BundleOptions::new(temp.path(), BundleMode::Production))
            .bundle(&temp.path().join("src/js/index.js"))
            .unwrap();

        assert!(!prod.code.contains("eval("));
        assert!(!prod.code.contains("sourceURL"));
        assert!(prod.code.len() < dev.code.len());
    }

    #[test]
    fn fails_on_unresolved_imports() {
        let temp = tempdir().unwrap();
        let entry = temp.path().join("index.js");
        fs::write(&entry, "import \"./missing\";\n").unwrap();

        let result = Bundler::new(BundleOptions::new(temp.path(), BundleMode::Development))
            .bundle(&entry);

        assert!(matches!(result, Err(BundleError::Resolve { .. })));
    }

    #[test]
    fn fails_on_missing_entry() {
        let temp = tempdir().unwrap();

        let result = Bundler::new(BundleOptions::new(temp.path(), BundleMode::Production))
            .bundle(&temp.path().join("nope.js"));

        assert!(matches!(result, Err(BundleError::Read { .. })));
    }
}
