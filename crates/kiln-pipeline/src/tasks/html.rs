//! Page templates rendered with minijinja.

use std::path::{Path, PathBuf};

use minijinja::{context, path_loader, Environment};

use super::{TaskError, TaskKind};
use crate::config::{BuildConfig, Mode};
use crate::output::write_atomic;

fn environment(templates_dir: &Path) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(path_loader(templates_dir));
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env
}

/// Render one page. `name` is the loader name, e.g. `pages/index.html`.
fn render(env: &Environment<'_>, name: &str, mode: Mode) -> Result<String, minijinja::Error> {
    let template = env.get_template(name)?;
    template.render(context! {
        mode => mode.as_str(),
        is_dev => mode.is_dev(),
    })
}

pub(super) fn run(config: &BuildConfig) -> Result<Vec<PathBuf>, TaskError> {
    let layout = &config.layout;
    let templates_dir = layout.templates_dir();
    let env = environment(&templates_dir);

    let mut outputs = Vec::new();
    let mut errors = Vec::new();

    for page in layout.pages().files() {
        let Some(stem) = page.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let name = format!("pages/{}", page.file_name().unwrap_or_default().to_string_lossy());

        match render(&env, &name, config.mode) {
            Ok(html) => {
                let target = layout.out.join(format!("{stem}.html"));
                write_atomic(&target, html).map_err(|e| TaskError::io(&target, e))?;
                outputs.push(target);
            }
            Err(e) => {
                tracing::debug!("Template {} failed: {}", name, e.display_debug_info());
                errors.push(format!("{name}: {e}"));
            }
        }
    }

    if !errors.is_empty() {
        return Err(TaskError::transform(TaskKind::Html, errors.join("\n")));
    }

    tracing::debug!("Rendered {} page(s)", outputs.len());
    Ok(outputs)
}
