//! Stylesheet compilation with lightningcss.
//!
//! The entry is bundled (its `@import`s inlined), nested rules are lowered
//! and vendor prefixes added for the configured browsers. Development output
//! is pretty printed; production output is minified.

use std::path::{Path, PathBuf};

use lightningcss::bundler::{Bundler, FileProvider};
use lightningcss::stylesheet::{MinifyOptions, ParserFlags, ParserOptions, PrinterOptions};
use lightningcss::targets::{Browsers, Targets};

use super::{TaskError, TaskKind};
use crate::config::{BuildConfig, Mode};
use crate::output::write_atomic;

/// Resolve browserslist queries into lightningcss targets.
pub(crate) fn targets(browsers: &[String]) -> Result<Targets, TaskError> {
    let browsers = Browsers::from_browserslist(browsers.iter().map(String::as_str))
        .map_err(|e| TaskError::Config(format!("Invalid browserslist query: {e}")))?;

    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Compile the stylesheet at `entry`.
pub(crate) fn compile(entry: &Path, mode: Mode, targets: Targets) -> Result<String, String> {
    let fs = FileProvider::new();
    let options = ParserOptions {
        flags: ParserFlags::CUSTOM_MEDIA,
        ..ParserOptions::default()
    };

    let mut bundler = Bundler::new(&fs, None, options);
    let mut stylesheet = bundler.bundle(entry).map_err(|e| e.to_string())?;

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: !mode.is_dev(),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    Ok(result.code)
}

pub(super) fn run(config: &BuildConfig) -> Result<Vec<PathBuf>, TaskError> {
    let layout = &config.layout;
    let entry = layout.style_entry();

    if !entry.is_file() {
        return Err(TaskError::Config(format!(
            "Style entry not found: {}",
            entry.display()
        )));
    }

    let targets = targets(&config.browsers)?;
    let mut css = compile(&entry, config.mode, targets)
        .map_err(|message| TaskError::transform(TaskKind::Styles, message))?;
    if !css.ends_with('\n') {
        css.push('\n');
    }

    let target = layout.style_output();
    write_atomic(&target, css).map_err(|e| TaskError::io(&target, e))?;

    Ok(vec![target])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("src/styles");
        fs::create_dir_all(&styles).unwrap();
        for (name, body) in files {
            fs::write(styles.join(name), body).unwrap();
        }
        temp
    }

    const STYLE: &str = "@import \"base.css\";\n\n.card {\n  color: red;\n\n  & .title {\n    font-weight: bold;\n  }\n}\n";
    const BASE: &str = "body {\n  margin: 0;\n}\n";

    #[test]
    fn development_output_is_expanded() {
        let temp = project(&[("style.css", STYLE), ("base.css", BASE)]);
        let config = BuildConfig::new(temp.path(), Mode::Development);

        run(&config).unwrap();

        let css = fs::read_to_string(config.layout.style_output()).unwrap();
        assert!(css.contains("body {\n  margin: 0;\n}"));
        assert!(css.contains(".card .title {"));
        assert!(css.lines().count() > 3);
    }

    #[test]
    fn production_output_is_minified() {
        let temp = project(&[("style.css", STYLE), ("base.css", BASE)]);
        let config = BuildConfig::new(temp.path(), Mode::Production);

        run(&config).unwrap();

        let css = fs::read_to_string(config.layout.style_output()).unwrap();
        assert!(css.contains("body{margin:0}"));
        assert!(css.contains(".card .title{"));
        assert_eq!(css.trim_end().lines().count(), 1);
    }

    #[test]
    fn invalid_selector_leaves_no_output() {
        let temp = project(&[("style.css", ".a) { color: red; }\n")]);
        let config = BuildConfig::new(temp.path(), Mode::Production);

        let err = run(&config).unwrap_err();

        assert!(err.is_recoverable());
        assert!(!config.layout.style_output().exists());
    }

    #[test]
    fn missing_import_leaves_no_output() {
        let temp = project(&[("style.css", "@import \"missing.css\";\n")]);
        let config = BuildConfig::new(temp.path(), Mode::Development);

        let err = run(&config).unwrap_err();

        assert!(err.is_recoverable());
        assert!(!config.layout.style_output().exists());
    }

    #[test]
    fn failed_compile_keeps_previous_output() {
        let temp = project(&[("style.css", BASE)]);
        let config = BuildConfig::new(temp.path(), Mode::Production);
        run(&config).unwrap();

        fs::write(temp.path().join("src/styles/style.css"), ".a) {}\n").unwrap();
        assert!(run(&config).is_err());

        let css = fs::read_to_string(config.layout.style_output()).unwrap();
        assert!(css.contains("body{margin:0}"));
    }

    #[test]
    fn missing_entry_is_a_configuration_error() {
        let temp = tempdir().unwrap();
        let config = BuildConfig::new(temp.path(), Mode::Production);

        assert!(matches!(run(&config), Err(TaskError::Config(_))));
    }

    #[test]
    fn rejects_bad_browserslist_queries() {
        assert!(targets(&["not a real query ((".to_string()]).is_err());
    }
}
