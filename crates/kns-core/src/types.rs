use crate::error::{KnsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The role a profile holds within the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Leader,
    ExternalPerson,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Member => "member",
            Role::Leader => "leader",
            Role::ExternalPerson => "external_person",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Role {
    type Err = KnsError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "member" => Ok(Role::Member),
            "leader" => Ok(Role::Leader),
            "external_person" => Ok(Role::ExternalPerson),
            _ => Err(KnsError::InvalidRole(format!(
                "unknown role '{s}': must be member, leader, or external_person"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamped
// ---------------------------------------------------------------------------

/// Shared creation/update timestamps carried by every stored entity.
///
/// Implementors keep `created_at` fixed after creation and bump
/// `updated_at` on every mutation.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
