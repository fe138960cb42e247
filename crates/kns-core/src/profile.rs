//! Member profiles.
//!
//! All profiles live in `.kns/profiles.yaml` as a single list. Emails are
//! unique across the store. Role changes to leader normally go through the
//! approval workflow (`approval` module); `make_leader` is the raw effect
//! that workflow applies once an approval succeeds.

use crate::error::{KnsError, Result};
use crate::io;
use crate::paths;
use crate::settings::Setting;
use crate::types::{Role, Timestamped};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    /// Whether contact information is visible to other members.
    /// Seeded from `Setting::default_contact_visibility` at creation.
    pub contact_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Timestamped for Profile {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// ---------------------------------------------------------------------------
// Internal file I/O
// ---------------------------------------------------------------------------

fn load_all(root: &Path) -> Result<Vec<Profile>> {
    let path = paths::profiles_path(root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(&content)?)
}

fn save_all(root: &Path, profiles: &[Profile]) -> Result<()> {
    let content = serde_yaml::to_string(profiles)?;
    io::atomic_write(&paths::profiles_path(root), content.as_bytes())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Create a new profile with the `member` role.
pub fn create(
    root: &Path,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
    email: impl Into<String>,
    settings: &Setting,
) -> Result<Profile> {
    let email = email.into();

    let mut profiles = load_all(root)?;
    if profiles.iter().any(|p| p.email == email) {
        return Err(KnsError::ProfileEmailExists(email));
    }

    let now = Utc::now();
    let profile = Profile {
        id: Uuid::new_v4(),
        first_name: first_name.into(),
        last_name: last_name.into(),
        email,
        role: Role::Member,
        contact_visible: settings.default_contact_visibility,
        created_at: now,
        updated_at: now,
    };

    profiles.push(profile.clone());
    save_all(root, &profiles)?;

    Ok(profile)
}

pub fn list(root: &Path) -> Result<Vec<Profile>> {
    load_all(root)
}

pub fn get(root: &Path, id: Uuid) -> Result<Profile> {
    let profiles = load_all(root)?;
    profiles
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| KnsError::ProfileNotFound(id.to_string()))
}

/// Promote a profile to the leader role. This is the effect an approved
/// promotion request applies; it performs no permission checks itself.
pub fn make_leader(root: &Path, id: Uuid) -> Result<Profile> {
    let mut profiles = load_all(root)?;
    let pos = profiles
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| KnsError::ProfileNotFound(id.to_string()))?;

    profiles[pos].role = Role::Leader;
    profiles[pos].updated_at = Utc::now();

    let updated = profiles[pos].clone();
    save_all(root, &profiles)?;

    Ok(updated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
