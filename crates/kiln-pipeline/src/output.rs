//! Writing build output.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write `contents` to `path` through a sibling temp file and a rename, so
/// readers never see a partial file. Parent directories are created.
pub fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = temp_path(path);
    if let Err(e) = fs::write(&temp, contents.as_ref()) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    fs::rename(&temp, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp);
    })
}

/// Copy `from` to `to` with the same atomic guarantee as [`write_atomic`].
pub fn copy_atomic(from: &Path, to: &Path) -> io::Result<()> {
    let bytes = fs::read(from)?;
    write_atomic(to, bytes)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.kiln-tmp"))
}

/// `path` re-rooted from `base` onto `out`. Paths outside `base` keep only
/// their file name.
pub fn mirror(path: &Path, base: &Path, out: &Path) -> PathBuf {
    match path.strip_prefix(base) {
        Ok(relative) => out.join(relative),
        Err(_) => out.join(path.file_name().unwrap_or_default()),
    }
}
