//! Atomic output writes via tempfile + rename.
//!
//! A generated document is written to a temporary file next to its target
//! and renamed over it, so a crash mid-write never leaves a half-filled
//! document behind.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Atomically write `content` to `path`, creating missing parent
/// directories.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, writing
/// fails, or the rename fails (e.g., cross-device).
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("no parent directory for {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;

    tmp.write_all(content.as_bytes())
        .with_context(|| format!("failed to write to temp file for {}", path.display()))?;

    tmp.flush()
        .with_context(|| format!("failed to flush temp file for {}", path.display()))?;

    tmp.persist(path)
        .with_context(|| format!("failed to atomically replace {}", path.display()))?;

    Ok(())
}
