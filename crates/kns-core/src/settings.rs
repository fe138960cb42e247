//! Application-wide settings.
//!
//! A single YAML file at `.kns/settings.yaml` holds the limits and
//! permission flags that guide the rest of the suite. The file is
//! optional: `load_or_default` falls back to defaults when it is absent,
//! mirroring get-or-create semantics. Components receive the loaded
//! `Setting` explicitly; there is no hidden global.

use crate::error::{KnsError, Result};
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    /// Whether promoting a member to leader requires a second party's consent.
    #[serde(default = "default_change_role_approval_required")]
    pub change_role_approval_required: bool,

    /// Days before a pending approval request expires.
    #[serde(default = "default_approval_timeout_days")]
    pub approval_timeout_days: u32,

    /// Maximum number of skills a profile may list.
    #[serde(default = "default_max_skills_per_user")]
    pub max_skills_per_user: u32,

    /// Whether newly created profiles expose contact information.
    #[serde(default = "default_contact_visibility")]
    pub default_contact_visibility: bool,
}

fn default_change_role_approval_required() -> bool {
    true
}

fn default_approval_timeout_days() -> u32 {
    7
}

fn default_max_skills_per_user() -> u32 {
    5
}

fn default_contact_visibility() -> bool {
    true
}

impl Default for Setting {
    fn default() -> Self {
        Self {
            change_role_approval_required: default_change_role_approval_required(),
            approval_timeout_days: default_approval_timeout_days(),
            max_skills_per_user: default_max_skills_per_user(),
            default_contact_visibility: default_contact_visibility(),
        }
    }
}

impl Setting {
    pub fn validate(&self) -> Result<()> {
        if self.approval_timeout_days == 0 {
            return Err(KnsError::InvalidSetting(
                "approval_timeout_days must be at least 1".to_string(),
            ));
        }
        if self.max_skills_per_user == 0 {
            return Err(KnsError::InvalidSetting(
                "max_skills_per_user must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The approval timeout expressed in seconds, as stored on each request.
    pub fn approval_timeout_seconds(&self) -> i64 {
        i64::from(self.approval_timeout_days) * 86_400
    }
}

/// Load settings from `.kns/settings.yaml`, defaulting when the file is
/// absent or empty.
pub fn load_or_default(root: &Path) -> Result<Setting> {
    let path = paths::settings_path(root);
    if !path.exists() {
        return Ok(Setting::default());
    }
    let content = std::fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(Setting::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

/// Validate and persist settings.
pub fn save(root: &Path, setting: &Setting) -> Result<()> {
    setting.validate()?;
    let content = serde_yaml::to_string(setting)?;
    io::atomic_write(&paths::settings_path(root), content.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
