//! Scaffold a demo project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Files written by `kiln init`, relative to the project root.
const SCAFFOLD: &[(&str, &str)] = &[
    ("kiln.toml", DEFAULT_CONFIG),
    ("src/templates/layout.html", LAYOUT_TEMPLATE),
    ("src/templates/pages/index.html", INDEX_PAGE),
    ("src/styles/style.css", STYLE),
    ("src/styles/base.css", BASE_STYLE),
    ("src/js/index.js", INDEX_SCRIPT),
    ("src/js/lib.js", LIB_SCRIPT),
    ("src/img/svg/heart.svg", HEART_ICON),
];

/// Run the init command.
pub async fn run(root: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing kiln project in {}", root.display());

    if root.join("src").exists() && !yes {
        tracing::warn!("src/ directory already exists. Use --yes to overwrite.");
        return Ok(());
    }

    for (relative, contents) in SCAFFOLD {
        let path = root.join(relative);
        if path.exists() && !yes {
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
    }

    for dir in ["src/fonts", "src/uploads"] {
        fs::create_dir_all(root.join(dir)).with_context(|| format!("Failed to create {}", dir))?;
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'kiln dev' to start the development server.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# kiln configuration

[build]
# "production" (minified) or "development". Unset, `kiln build` and
# `kiln run` build for production while `kiln dev` and `kiln watch` build
# for development.
# mode = "production"
# Browsers to add vendor prefixes for
browsers = ["> 0.1%"]

[server]
port = 3000
open = true

[watch]
# Re-render templates on change; false only reloads the browser
rebuild_templates = true
"#;

const LAYOUT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% block title %}kiln{% endblock %}</title>
  <link rel="stylesheet" href="/src/css/style.css">
</head>
<body>
  {% block content %}{% endblock %}
  <script src="/src/js/scripts.js"></script>
</body>
</html>
"#;

const INDEX_PAGE: &str = r#"{% extends "layout.html" %}

{% block title %}Home{% endblock %}

{% block content %}
<main class="page">
  <h1 class="page-title">
    <svg class="icon" width="24" height="24"><use href="/src/img/svg/symbol/sprite.svg#heart"></use></svg>
    Hello from kiln
  </h1>
  {% if is_dev %}
  <p class="page-note">Development build</p>
  {% endif %}
</main>
{% endblock %}
"#;

const STYLE: &str = r#"@import "base.css";

.page {
  max-width: 40rem;
  margin: 0 auto;

  & .page-title {
    display: flex;
    gap: 0.5rem;
    align-items: center;
    user-select: none;
  }

  & .page-note {
    color: #666;
  }
}

.icon {
  fill: crimson;
}
"#;

const BASE_STYLE: &str = r#"* {
  box-sizing: border-box;
}

body {
  margin: 0;
  font-family: system-ui, sans-serif;
  line-height: 1.5;
}
"#;

const INDEX_SCRIPT: &str = r#"import divide from "./lib.js";

console.log(divide(4, 2));
console.log(divide(5, 2));

new Promise((resolve) => {
  setTimeout(resolve, 500);
}).then(() => {
  console.log("promise resolved");
});
"#;

const LIB_SCRIPT: &str = r#"export default function divide(a, b) {
  return a / b;
}
"#;

const HEART_ICON: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
  <title>heart</title>
  <path fill="#e11d48" d="M12 21s-7-4.35-9.5-9A5.5 5.5 0 0 1 12 6a5.5 5.5 0 0 1 9.5 6c-2.5 4.65-9.5 9-9.5 9z"/>
</svg>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Project;
    use kiln_pipeline::{BuildConfig, LogNotifier, Mode, Orchestrator};
    use tempfile::tempdir;

    #[tokio::test]
    async fn scaffold_builds_cleanly() {
        let temp = tempdir().unwrap();

        run(temp.path(), false).await.unwrap();

        let config = BuildConfig::new(temp.path(), Mode::Production);
        let summary = Orchestrator::new(&config, &LogNotifier).build().unwrap();
        assert!(summary.is_success(), "{:?}", summary.failures);

        let out = temp.path().join("build");
        assert!(out.join("index.html").is_file());
        let sprite = fs::read_to_string(out.join("src/img/svg/symbol/sprite.svg")).unwrap();
        assert!(sprite.contains(r#"<symbol id="heart""#));
        assert!(!sprite.contains("fill="));
    }

    #[tokio::test]
    async fn keeps_existing_files_without_yes() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();

        run(temp.path(), false).await.unwrap();

        assert!(!temp.path().join("kiln.toml").exists());
    }

    #[tokio::test]
    async fn overwrites_with_yes() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("kiln.toml"), "# old").unwrap();

        run(temp.path(), true).await.unwrap();

        let config = fs::read_to_string(temp.path().join("kiln.toml")).unwrap();
        assert!(config.contains("[build]"));
    }

    #[tokio::test]
    async fn scaffold_config_leaves_mode_to_the_command() {
        let temp = tempdir().unwrap();

        run(temp.path(), false).await.unwrap();

        let project = Project::load(temp.path(), Path::new("kiln.toml")).unwrap();
        assert_eq!(
            project.build_config(None, Mode::Development).mode,
            Mode::Development
        );
        assert_eq!(
            project.build_config(None, Mode::Production).mode,
            Mode::Production
        );
    }
}
