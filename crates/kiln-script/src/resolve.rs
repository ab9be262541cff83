//! Module specifier resolution.
//!
//! Relative specifiers resolve against the importing file. Bare specifiers
//! are looked up in `node_modules` directories from the importer upwards,
//! honoring `module`/`main` in the package manifest.

use std::fs;
use std::path::{Path, PathBuf};

use crate::BundleError;

/// Extensions probed when a specifier omits one.
const EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "json"];

/// Resolves import specifiers to files on disk.
#[derive(Debug, Clone, Default)]
pub struct Resolver;

impl Resolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `request` as imported from the file `from`.
    pub fn resolve(&self, request: &str, from: &Path) -> Result<PathBuf, BundleError> {
        let not_found = || BundleError::Resolve {
            request: request.to_string(),
            from: from.to_path_buf(),
        };

        let base = from.parent().unwrap_or(Path::new(""));

        if is_relative(request) {
            return probe_file(&base.join(request)).ok_or_else(not_found);
        }

        let (package, subpath) = split_package(request).ok_or_else(not_found)?;

        for dir in base.ancestors() {
            let package_dir = dir.join("node_modules").join(package);
            if !package_dir.is_dir() {
                continue;
            }

            let resolved = match subpath {
                Some(subpath) => probe_file(&package_dir.join(subpath)),
                None => probe_package(&package_dir),
            };
            return resolved.ok_or_else(not_found);
        }

        Err(not_found())
    }
}

fn is_relative(request: &str) -> bool {
    request.starts_with("./") || request.starts_with("../") || request.starts_with('/')
}

/// Split `@scope/name/sub/path` into (`@scope/name`, `Some("sub/path")`).
fn split_package(request: &str) -> Option<(&str, Option<&str>)> {
    let split_at = if request.starts_with('@') {
        let scope_end = request.find('/')?;
        request[scope_end + 1..].find('/').map(|i| scope_end + 1 + i)
    } else {
        request.find('/')
    };

    Some(match split_at {
        Some(i) => (&request[..i], Some(&request[i + 1..]).filter(|s| !s.is_empty())),
        None => (request, None),
    })
}

fn probe_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }

    for ext in EXTENSIONS {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if path.is_dir() {
        return probe_package(path);
    }

    None
}

fn probe_package(dir: &Path) -> Option<PathBuf> {
    let manifest = dir.join("package.json");
    if let Ok(content) = fs::read_to_string(&manifest) {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) {
            for field in ["module", "main"] {
                if let Some(entry) = json.get(field).and_then(|v| v.as_str()) {
                    let target = dir.join(entry);
                    if target.is_file() {
                        return Some(target);
                    }
                    if let Some(found) = probe_index_or_file(&target) {
                        return Some(found);
                    }
                }
            }
        }
    }

    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("index.{ext}")))
        .find(|p| p.is_file())
}

fn probe_index_or_file(path: &Path) -> Option<PathBuf> {
    if path.is_dir() {
        return EXTENSIONS
            .iter()
            .map(|ext| path.join(format!("index.{ext}")))
            .find(|p| p.is_file());
    }
    probe_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn resolves_relative_with_extension_probing() {
        let temp = tempdir().unwrap();
        let entry = temp.path().join("src/js/index.js");
        touch(&entry, "");
        touch(&temp.path().join("src/js/lib.js"), "");
        touch(&temp.path().join("src/js/utils/index.js"), "");

        let resolver = Resolver::new();

        assert_eq!(
            resolver.resolve("./lib", &entry).unwrap(),
            temp.path().join("src/js/lib.js")
        );
        assert_eq!(
            resolver.resolve("./lib.js", &entry).unwrap(),
            temp.path().join("src/js/lib.js")
        );
        assert_eq!(
            resolver.resolve("./utils", &entry).unwrap(),
            temp.path().join("src/js/utils/index.js")
        );
    }

    #[test]
    fn resolves_packages_from_manifest() {
        let temp = tempdir().unwrap();
        let entry = temp.path().join("src/js/index.js");
        touch(&entry, "");
        touch(
            &temp.path().join("node_modules/jquery/package.json"),
            r#"{"main": "dist/jquery.js"}"#,
        );
        touch(&temp.path().join("node_modules/jquery/dist/jquery.js"), "");

        let resolved = Resolver::new().resolve("jquery", &entry).unwrap();

        assert_eq!(resolved, temp.path().join("node_modules/jquery/dist/jquery.js"));
    }

    #[test]
    fn resolves_package_subpaths() {
        let temp = tempdir().unwrap();
        let entry = temp.path().join("src/js/index.js");
        touch(&entry, "");
        touch(
            &temp.path().join("node_modules/core-js/features/promise/index.js"),
            "",
        );

        let resolved = Resolver::new()
            .resolve("core-js/features/promise", &entry)
            .unwrap();

        assert_eq!(
            resolved,
            temp.path().join("node_modules/core-js/features/promise/index.js")
        );
    }

    #[test]
    fn reports_missing_modules() {
        let temp = tempdir().unwrap();
        let entry = temp.path().join("index.js");
        touch(&entry, "");

        let result = Resolver::new().resolve("left-pad", &entry);

        assert!(matches!(result, Err(BundleError::Resolve { .. })));
    }

    #[test]
    fn splits_scoped_packages() {
        assert_eq!(split_package("lodash"), Some(("lodash", None)));
        assert_eq!(split_package("a/b/c"), Some(("a", Some("b/c"))));
        assert_eq!(split_package("@babel/runtime"), Some(("@babel/runtime", None)));
        assert_eq!(
            split_package("@babel/runtime/helpers/x"),
            Some(("@babel/runtime", Some("helpers/x")))
        );
    }
}
