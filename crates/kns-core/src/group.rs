//! Disciple-making groups.
//!
//! Groups form a tree: an origin group has no parent, and every other
//! group descends from it. A profile belongs to at most one group; the
//! leader of a group is not counted among its members (they usually
//! belong to the parent group).

use crate::error::{KnsError, Result};
use crate::io;
use crate::paths;
use crate::profile;
use crate::types::Timestamped;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub profile: Uuid,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub leader: Uuid,
    /// Slug of the parent group; `None` marks an origin group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn is_origin(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_member(&self, profile: Uuid) -> bool {
        self.members.iter().any(|m| m.profile == profile)
    }
}

impl Timestamped for Group {
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

fn load_all(root: &Path) -> Result<Vec<Group>> {
    let path = paths::groups_path(root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(&content)?)
}

fn save_all(root: &Path, groups: &[Group]) -> Result<()> {
    let content = serde_yaml::to_string(groups)?;
    io::atomic_write(&paths::groups_path(root), content.as_bytes())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Create a new group led by `leader`.
pub fn create(
    root: &Path,
    slug: &str,
    name: impl Into<String>,
    description: Option<String>,
    leader: Uuid,
    parent: Option<&str>,
) -> Result<Group> {
    paths::validate_slug(slug)?;

    // Leader must exist.
    profile::get(root, leader)?;

    let mut groups = load_all(root)?;
    if groups.iter().any(|g| g.slug == slug) {
        return Err(KnsError::GroupExists(slug.to_string()));
    }
    if let Some(parent_slug) = parent {
        if !groups.iter().any(|g| g.slug == parent_slug) {
            return Err(KnsError::GroupNotFound(parent_slug.to_string()));
        }
    }

    let now = Utc::now();
    let group = Group {
        slug: slug.to_string(),
        name: name.into(),
        description,
        leader,
        parent: parent.map(str::to_string),
        members: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    groups.push(group.clone());
    save_all(root, &groups)?;

    Ok(group)
}

pub fn list(root: &Path) -> Result<Vec<Group>> {
    load_all(root)
}

pub fn get(root: &Path, slug: &str) -> Result<Group> {
    let groups = load_all(root)?;
    groups
        .into_iter()
        .find(|g| g.slug == slug)
        .ok_or_else(|| KnsError::GroupNotFound(slug.to_string()))
}

/// Add a profile to a group. A profile can only belong to one group.
pub fn add_member(root: &Path, slug: &str, member: Uuid) -> Result<Group> {
    // Member must exist.
    profile::get(root, member)?;

    let mut groups = load_all(root)?;

    if let Some(existing) = groups.iter().find(|g| g.has_member(member)) {
        return Err(KnsError::AlreadyGroupMember {
            profile: member.to_string(),
            group: existing.slug.clone(),
        });
    }

    let pos = groups
        .iter()
        .position(|g| g.slug == slug)
        .ok_or_else(|| KnsError::GroupNotFound(slug.to_string()))?;

    groups[pos].members.push(GroupMember {
        profile: member,
        joined_at: Utc::now(),
    });
    groups[pos].updated_at = Utc::now();

    let updated = groups[pos].clone();
    save_all(root, &groups)?;

    Ok(updated)
}

/// The group a profile belongs to as a member, if any.
pub fn member_group(root: &Path, member: Uuid) -> Result<Option<Group>> {
    let groups = load_all(root)?;
    Ok(groups.into_iter().find(|g| g.has_member(member)))
}

/// The group a profile leads, if any.
pub fn led_group(root: &Path, leader: Uuid) -> Result<Option<Group>> {
    let groups = load_all(root)?;
    Ok(groups.into_iter().find(|g| g.leader == leader))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
