use crate::error::{KnsError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Store layout constants
// ---------------------------------------------------------------------------

pub const KNS_DIR: &str = ".kns";

pub const SETTINGS_FILE: &str = ".kns/settings.yaml";
pub const PROFILES_FILE: &str = ".kns/profiles.yaml";
pub const GROUPS_FILE: &str = ".kns/groups.yaml";
pub const APPROVALS_FILE: &str = ".kns/approvals.yaml";
pub const NOTIFICATIONS_FILE: &str = ".kns/notifications.yaml";
pub const SKILLS_FILE: &str = ".kns/skills.yaml";

pub const SECRET_FILE: &str = ".kns/secret.key";
pub const OUTBOX_DIR: &str = ".kns/outbox";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn kns_dir(root: &Path) -> PathBuf {
    root.join(KNS_DIR)
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

pub fn profiles_path(root: &Path) -> PathBuf {
    root.join(PROFILES_FILE)
}

pub fn groups_path(root: &Path) -> PathBuf {
    root.join(GROUPS_FILE)
}

pub fn approvals_path(root: &Path) -> PathBuf {
    root.join(APPROVALS_FILE)
}

pub fn notifications_path(root: &Path) -> PathBuf {
    root.join(NOTIFICATIONS_FILE)
}

pub fn skills_path(root: &Path) -> PathBuf {
    root.join(SKILLS_FILE)
}

pub fn secret_path(root: &Path) -> PathBuf {
    root.join(SECRET_FILE)
}

pub fn outbox_dir(root: &Path) -> PathBuf {
    root.join(OUTBOX_DIR)
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(KnsError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs() {
        for slug in ["first-12", "a", "nairobi-central-3", "x1"] {
            validate_slug(slug).unwrap_or_else(|_| panic!("expected valid: {slug}"));
        }
    }

    #[test]
    fn invalid_slugs() {
        for slug in [
            "",
            "-starts-with-dash",
            "ends-with-dash-",
            "has spaces",
            "UPPER",
            "a_b",
        ] {
            assert!(validate_slug(slug).is_err(), "expected invalid: {slug}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/kns");
        assert_eq!(
            settings_path(root),
            PathBuf::from("/tmp/kns/.kns/settings.yaml")
        );
        assert_eq!(
            approvals_path(root),
            PathBuf::from("/tmp/kns/.kns/approvals.yaml")
        );
        assert_eq!(secret_path(root), PathBuf::from("/tmp/kns/.kns/secret.key"));
    }
}
