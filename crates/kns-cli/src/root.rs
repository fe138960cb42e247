use std::path::PathBuf;

/// Resolve the workspace root.
///
/// An explicit `--root` (or KNS_ROOT) wins. Otherwise walk up from the
/// current directory looking for a `.kns/` data directory, then fall
/// back to the nearest `.git/` root, then the current directory itself.
pub fn resolve_root(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    let cwd = std::env::current_dir()?;

    let mut dir = cwd.as_path();
    loop {
        if dir.join(kns_core::paths::KNS_DIR).is_dir() {
            return Ok(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }

    let mut dir = cwd.as_path();
    loop {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return Ok(cwd),
        }
    }
}
