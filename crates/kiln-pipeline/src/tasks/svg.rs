//! SVG sprite generation.

use std::fs;
use std::path::{Path, PathBuf};

use kiln_svg::{
    optimize, strip_attributes, symbol_id, unescape_gt, OptimizeOptions, SpriteBuilder,
    PRESENTATION_ATTRIBUTES,
};

use super::{TaskError, TaskKind};
use crate::config::BuildConfig;
use crate::output::write_atomic;

/// Minify one icon and strip its presentation attributes.
fn prepare_icon(source: &str) -> Result<String, kiln_svg::SvgError> {
    let minified = optimize(source, &OptimizeOptions::icons())?;
    let stripped = strip_attributes(&minified, PRESENTATION_ATTRIBUTES)?;
    Ok(unescape_gt(&stripped))
}

fn icon_error(path: &Path, error: impl std::fmt::Display) -> TaskError {
    TaskError::transform(TaskKind::Svg, format!("{}: {}", path.display(), error))
}

pub(super) fn run(config: &BuildConfig) -> Result<Vec<PathBuf>, TaskError> {
    let layout = &config.layout;
    let icons = layout.icons().files();

    if icons.is_empty() {
        tracing::debug!("No icons found, skipping sprite");
        return Ok(Vec::new());
    }

    let mut sprite = SpriteBuilder::new();
    for icon in &icons {
        let source = fs::read_to_string(icon).map_err(|e| TaskError::io(icon, e))?;
        let stem = icon.file_stem().unwrap_or_default().to_string_lossy();

        let prepared = prepare_icon(&source).map_err(|e| icon_error(icon, e))?;
        sprite
            .add(&symbol_id(&stem), &prepared)
            .map_err(|e| icon_error(icon, e))?;
    }

    let target = layout.sprite_output();
    write_atomic(&target, sprite.build()).map_err(|e| TaskError::io(&target, e))?;
    tracing::debug!("Sprite with {} symbol(s)", sprite.len());

    Ok(vec![target])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use tempfile::tempdir;

    fn project(icons: &[(&str, &str)]) -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("src/img/svg");
        fs::create_dir_all(&dir).unwrap();
        for (name, body) in icons {
            fs::write(dir.join(name), body).unwrap();
        }
        temp
    }

    const ARROW: &str = r##"<?xml version="1.0"?>
<!-- exported -->
<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
  <title>arrow</title>
  <path d="M0 0h24" fill="#000" stroke="red" style="opacity:.5"/>
</svg>
"##;

    const CLOSE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 16 16"><g fill="none"><path d="M1 1l14 14"/></g></svg>"#;

    #[test]
    fn combines_icons_into_distinct_symbols() {
        let temp = project(&[("arrow.svg", ARROW), ("close.svg", CLOSE)]);
        let config = BuildConfig::new(temp.path(), Mode::Production);

        let outputs = run(&config).unwrap();

        let sprite = fs::read_to_string(&outputs[0]).unwrap();
        assert!(sprite.contains(r#"<symbol id="arrow" viewBox="0 0 24 24">"#));
        assert!(sprite.contains(r#"<symbol id="close" viewBox="0 0 16 16">"#));
        assert_eq!(sprite.matches("<symbol").count(), 2);
    }

    #[test]
    fn strips_presentation_attributes_and_metadata() {
        let temp = project(&[("arrow.svg", ARROW), ("close.svg", CLOSE)]);
        let config = BuildConfig::new(temp.path(), Mode::Production);

        run(&config).unwrap();

        let sprite = fs::read_to_string(config.layout.sprite_output()).unwrap();
        assert!(!sprite.contains("fill="));
        assert!(!sprite.contains("stroke="));
        assert!(!sprite.contains("style="));
        assert!(!sprite.contains("<title>"));
        assert!(!sprite.contains("exported"));
        assert!(sprite.contains(r#"d="M0 0h24""#));
    }

    #[test]
    fn icons_sharing_ids_stay_apart() {
        const SHAPE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 8 8"><defs><path id="shape" d="M0 0h8"/></defs><use href="#shape"/></svg>"##;
        let temp = project(&[("a.svg", SHAPE), ("b.svg", SHAPE)]);
        let config = BuildConfig::new(temp.path(), Mode::Production);

        run(&config).unwrap();

        let sprite = fs::read_to_string(config.layout.sprite_output()).unwrap();
        assert!(!sprite.contains(r#"id="shape""#));
        assert!(sprite.contains(r#"id="a-shape""#));
        assert!(sprite.contains(r##"href="#b-shape""##));
    }

    #[test]
    fn malformed_icons_are_recoverable() {
        let temp = project(&[("broken.svg", "<svg><path></svg>")]);
        let config = BuildConfig::new(temp.path(), Mode::Production);

        let err = run(&config).unwrap_err();

        assert!(err.is_recoverable());
        assert!(!config.layout.sprite_output().exists());
    }

    #[test]
    fn no_icons_writes_nothing() {
        let temp = tempdir().unwrap();
        let config = BuildConfig::new(temp.path(), Mode::Production);

        assert!(run(&config).unwrap().is_empty());
        assert!(!config.layout.sprite_output().exists());
    }
}
