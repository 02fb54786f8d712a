//! Filesystem utilities.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Atomically replace `path` with `contents`.
///
/// The contents are staged in a temporary file in the same directory and
/// moved into place only on success, so a previously valid file is never
/// replaced by a partial write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    ensure_dir(dir)?;

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to stage output in {}", dir.display()))?;
    staged
        .write_all(contents.as_bytes())
        .with_context(|| format!("failed to write staged output for {}", path.display()))?;
    staged
        .persist(path)
        .with_context(|| format!("failed to move staged output into {}", path.display()))?;
    Ok(())
}
