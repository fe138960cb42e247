//! Per-profile skill lists, capped by `Setting::max_skills_per_user`.
//!
//! Layout:
//!   .kns/skills.yaml   — one entry per profile that has listed skills

use crate::error::{KnsError, Result};
use crate::io;
use crate::paths;
use crate::profile;
use crate::settings::Setting;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSkills {
    pub profile: Uuid,
    pub skills: Vec<String>,
}

// ---------------------------------------------------------------------------
// Internal file I/O
// ---------------------------------------------------------------------------

fn load_all(root: &Path) -> Result<Vec<ProfileSkills>> {
    let path = paths::skills_path(root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(&content)?)
}

fn save_all(root: &Path, items: &[ProfileSkills]) -> Result<()> {
    let content = serde_yaml::to_string(items)?;
    io::atomic_write(&paths::skills_path(root), content.as_bytes())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The skills a profile has listed (empty when none).
pub fn get(root: &Path, profile_id: Uuid) -> Result<Vec<String>> {
    let items = load_all(root)?;
    Ok(items
        .into_iter()
        .find(|s| s.profile == profile_id)
        .map(|s| s.skills)
        .unwrap_or_default())
}

/// Replace a profile's skill list. Duplicates are dropped (first
/// occurrence wins) before the limit check.
pub fn set(
    root: &Path,
    profile_id: Uuid,
    skills: Vec<String>,
    settings: &Setting,
) -> Result<ProfileSkills> {
    profile::get(root, profile_id)?;

    let mut deduped: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim().to_string();
        if !skill.is_empty() && !deduped.contains(&skill) {
            deduped.push(skill);
        }
    }
    if deduped.len() > settings.max_skills_per_user as usize {
        return Err(KnsError::SkillLimitReached(settings.max_skills_per_user));
    }

    let mut items = load_all(root)?;
    let entry = ProfileSkills {
        profile: profile_id,
        skills: deduped,
    };
    match items.iter_mut().find(|s| s.profile == profile_id) {
        Some(existing) => *existing = entry.clone(),
        None => items.push(entry.clone()),
    }
    save_all(root, &items)?;

    Ok(entry)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_profile(root: &Path) -> Uuid {
        profile::create(root, "Jane", "Doe", "jane@example.com", &Setting::default())
            .unwrap()
            .id
    }

    #[test]
    fn empty_by_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let id = make_profile(dir.path());
        assert!(get(dir.path(), id).unwrap().is_empty());
    }

    #[test]
    fn set_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let id = make_profile(dir.path());
        set(
            dir.path(),
            id,
            vec!["teaching".to_string(), "translation".to_string()],
            &Setting::default(),
        )
        .unwrap();
        assert_eq!(get(dir.path(), id).unwrap(), ["teaching", "translation"]);
    }

    #[test]
    fn duplicates_and_blanks_dropped() {
        let dir = tempfile::TempDir::new().unwrap();
        let id = make_profile(dir.path());
        let result = set(
            dir.path(),
            id,
            vec![
                "teaching".to_string(),
                " teaching ".to_string(),
                "".to_string(),
                "music".to_string(),
            ],
            &Setting::default(),
        )
        .unwrap();
        assert_eq!(result.skills, ["teaching", "music"]);
    }

    #[test]
    fn limit_enforced() {
        let dir = tempfile::TempDir::new().unwrap();
        let id = make_profile(dir.path());
        let settings = Setting {
            max_skills_per_user: 2,
            ..Setting::default()
        };
        let skills: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let err = set(dir.path(), id, skills, &settings).unwrap_err();
        assert!(matches!(err, KnsError::SkillLimitReached(2)));
    }

    #[test]
    fn unknown_profile_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = set(
            dir.path(),
            Uuid::new_v4(),
            vec!["teaching".to_string()],
            &Setting::default(),
        )
        .unwrap_err();
        assert!(matches!(err, KnsError::ProfileNotFound(_)));
    }
}
