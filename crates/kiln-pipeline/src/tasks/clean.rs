use std::fs;
use std::io;
use std::path::Path;

use super::TaskError;

/// Delete everything below `out`, keeping the directory itself.
///
/// A missing output root is not an error. Returns the number of top-level
/// entries removed.
pub fn clean(out: &Path) -> Result<usize, TaskError> {
    let entries = match fs::read_dir(out) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(TaskError::io(out, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| TaskError::io(out, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| TaskError::io(&path, e))?;

        let result = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| TaskError::io(&path, e))?;
        removed += 1;
    }

    tracing::debug!("Removed {} entries from {}", removed, out.display());
    Ok(removed)
}
