use std::path::PathBuf;

use super::TaskError;
use crate::config::BuildConfig;
use crate::output::{copy_atomic, mirror};

/// Copy font files into the output tree unchanged.
pub(super) fn run(config: &BuildConfig) -> Result<Vec<PathBuf>, TaskError> {
    let layout = &config.layout;
    let selector = layout.fonts();
    let out = layout.fonts_output();

    let mut outputs = Vec::new();
    for font in selector.files() {
        let target = mirror(&font, &selector.dir, &out);
        copy_atomic(&font, &target).map_err(|e| TaskError::io(&font, e))?;
        outputs.push(target);
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn copies_allowed_extensions_byte_for_byte() {
        let temp = tempdir().unwrap();
        let fonts = temp.path().join("src/fonts/inter");
        fs::create_dir_all(&fonts).unwrap();
        let bytes: Vec<u8> = (0..=255).collect();
        fs::write(fonts.join("Inter.woff2"), &bytes).unwrap();
        fs::write(fonts.join("LICENSE.txt"), "OFL").unwrap();
        let config = BuildConfig::new(temp.path(), Mode::Production);

        let outputs = run(&config).unwrap();

        let copied = temp.path().join("build/src/fonts/inter/Inter.woff2");
        assert_eq!(outputs, vec![copied.clone()]);
        assert_eq!(fs::read(copied).unwrap(), bytes);
        assert!(!temp.path().join("build/src/fonts/inter/LICENSE.txt").exists());
    }

    #[test]
    fn no_fonts_is_not_an_error() {
        let temp = tempdir().unwrap();
        let config = BuildConfig::new(temp.path(), Mode::Production);

        assert!(run(&config).unwrap().is_empty());
    }
}
