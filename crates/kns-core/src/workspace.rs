//! Project initialization.

use crate::error::Result;
use crate::io;
use crate::paths;
use crate::settings::{self, Setting};
use std::path::Path;

/// Initialize the `.kns/` data directory: default settings file plus
/// gitignore entries for the signing secret and the mail outbox.
/// Idempotent — existing files are left alone.
pub fn init(root: &Path) -> Result<()> {
    io::ensure_dir(&paths::kns_dir(root))?;

    let default_settings = serde_yaml::to_string(&Setting::default())?;
    io::write_if_missing(&paths::settings_path(root), default_settings.as_bytes())?;

    io::ensure_gitignore_entry(root, paths::SECRET_FILE)?;
    io::ensure_gitignore_entry(root, ".kns/outbox/")?;

    Ok(())
}

pub fn is_initialized(root: &Path) -> bool {
    paths::kns_dir(root).is_dir()
}

pub fn ensure_initialized(root: &Path) -> Result<()> {
    if !is_initialized(root) {
        return Err(crate::error::KnsError::NotInitialized);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
