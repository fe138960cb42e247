//! Action approval workflow — privileged actions gated on a leader's consent.
//!
//! Layout:
//!   .kns/approvals.yaml   — list of all approval requests
//!
//! IDs are sequential: A1, A2, A3, …
//! A request starts `pending` and is mutated exactly once, when it is
//! approved, rejected, or found expired. Expiry is a lazy check made at
//! decision time: a decision arriving after `created_at + timeout` moves
//! the request to `expired` without applying its action.

use crate::error::{KnsError, Result};
use crate::group;
use crate::io;
use crate::paths;
use crate::profile;
use crate::settings::Setting;
use crate::types::Timestamped;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ApprovalStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = KnsError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            "expired" => Ok(ApprovalStatus::Expired),
            _ => Err(KnsError::InvalidApprovalStatus(format!(
                "unknown status '{s}': must be pending, approved, rejected, or expired"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ApprovalAction
// ---------------------------------------------------------------------------

/// The action an approval gates, applied when the request is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApprovalAction {
    PromoteToLeader { new_leader: Uuid },
}

impl ApprovalAction {
    /// The profile the action targets.
    pub fn target(&self) -> Uuid {
        match self {
            ApprovalAction::PromoteToLeader { new_leader } => *new_leader,
        }
    }

    fn apply(&self, root: &Path) -> Result<()> {
        match self {
            ApprovalAction::PromoteToLeader { new_leader } => {
                profile::make_leader(root, *new_leader)?;
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ActionApproval
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionApproval {
    pub id: String,
    pub action: ApprovalAction,
    pub status: ApprovalStatus,
    /// Profile that initiated the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    /// Group whose leader must decide the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_group: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_timeout_seconds() -> i64 {
    7 * 86_400
}

impl ActionApproval {
    /// The instant after which a pending request can no longer be decided.
    pub fn deadline(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.timeout_seconds)
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline()
    }
}

impl Timestamped for ActionApproval {
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

fn load_all(root: &Path) -> Result<Vec<ActionApproval>> {
    let path = paths::approvals_path(root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(&content)?)
}

fn save_all(root: &Path, items: &[ActionApproval]) -> Result<()> {
    let content = serde_yaml::to_string(items)?;
    io::atomic_write(&paths::approvals_path(root), content.as_bytes())
}

fn next_id(items: &[ActionApproval]) -> String {
    let n = items.len() + 1;
    format!("A{n}")
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Whether promoting a member initiated by `created_by` needs a leader's
/// consent. No approval is needed when the flag is off, when the initiator
/// belongs to no group, or when their group is an origin group.
pub fn requires_approval(root: &Path, created_by: Uuid, settings: &Setting) -> Result<bool> {
    if !settings.change_role_approval_required {
        return Ok(false);
    }
    let Some(member_group) = group::member_group(root, created_by)? else {
        return Ok(false);
    };
    Ok(!member_group.is_origin())
}

/// Create a pending promotion request for `new_leader`.
///
/// The target must belong to a group; that group becomes the consumer
/// group whose leader decides the request. The timeout comes from
/// `Setting::approval_timeout_days`.
pub fn request(
    root: &Path,
    new_leader: Uuid,
    created_by: Option<Uuid>,
    settings: &Setting,
    now: DateTime<Utc>,
) -> Result<ActionApproval> {
    // Target must exist and be part of a group.
    profile::get(root, new_leader)?;
    let consumer_group = group::member_group(root, new_leader)?
        .ok_or_else(|| KnsError::NotAGroupMember(new_leader.to_string()))?;

    let mut items = load_all(root)?;
    let id = next_id(&items);

    let approval = ActionApproval {
        id,
        action: ApprovalAction::PromoteToLeader { new_leader },
        status: ApprovalStatus::Pending,
        created_by,
        consumer_group: Some(consumer_group.slug),
        read: false,
        timeout_seconds: settings.approval_timeout_seconds(),
        approved_by: None,
        approved_at: None,
        created_at: now,
        updated_at: now,
    };

    items.push(approval.clone());
    save_all(root, &items)?;

    Ok(approval)
}

pub fn list(root: &Path, status_filter: Option<&str>) -> Result<Vec<ActionApproval>> {
    let items = load_all(root)?;
    let filtered = match status_filter {
        Some("all") | None => items,
        Some(status) => {
            let status: ApprovalStatus = status.parse()?;
            items.into_iter().filter(|a| a.status == status).collect()
        }
    };
    Ok(filtered)
}

pub fn get(root: &Path, id: &str) -> Result<ActionApproval> {
    let items = load_all(root)?;
    items
        .into_iter()
        .find(|a| a.id == id)
        .ok_or_else(|| KnsError::ApprovalNotFound(id.to_string()))
}

/// Whether `actor` may decide this approval: they must lead the consumer
/// group the request was created for.
pub fn can_decide(root: &Path, approval: &ActionApproval, actor: Uuid) -> Result<bool> {
    let Some(ref slug) = approval.consumer_group else {
        return Ok(false);
    };
    let consumer_group = group::get(root, slug)?;
    Ok(consumer_group.leader == actor)
}

/// Approve a pending request and apply its action.
///
/// Fails with `AlreadyProcessed` when the request is no longer pending.
/// When `now` is past the deadline the request transitions to `expired`,
/// the call fails with `ApprovalExpired`, and the action is never applied.
pub fn approve(
    root: &Path,
    id: &str,
    approver: Uuid,
    now: DateTime<Utc>,
) -> Result<ActionApproval> {
    let mut items = load_all(root)?;
    let pos = items
        .iter()
        .position(|a| a.id == id)
        .ok_or_else(|| KnsError::ApprovalNotFound(id.to_string()))?;

    if items[pos].status != ApprovalStatus::Pending {
        return Err(KnsError::AlreadyProcessed(id.to_string()));
    }
    if items[pos].is_past_deadline(now) {
        items[pos].status = ApprovalStatus::Expired;
        items[pos].updated_at = now;
        save_all(root, &items)?;
        return Err(KnsError::ApprovalExpired(id.to_string()));
    }

    // Apply the effect before recording the approval so a failed action
    // never leaves an approved request with nothing done.
    items[pos].action.apply(root)?;

    items[pos].status = ApprovalStatus::Approved;
    items[pos].approved_by = Some(approver);
    items[pos].approved_at = Some(now);
    items[pos].updated_at = now;

    let approved = items[pos].clone();
    save_all(root, &items)?;

    Ok(approved)
}

/// Reject a pending request. Same guards as `approve`; the action is not
/// applied.
pub fn reject(
    root: &Path,
    id: &str,
    _rejector: Uuid,
    now: DateTime<Utc>,
) -> Result<ActionApproval> {
    let mut items = load_all(root)?;
    let pos = items
        .iter()
        .position(|a| a.id == id)
        .ok_or_else(|| KnsError::ApprovalNotFound(id.to_string()))?;

    if items[pos].status != ApprovalStatus::Pending {
        return Err(KnsError::AlreadyProcessed(id.to_string()));
    }
    if items[pos].is_past_deadline(now) {
        items[pos].status = ApprovalStatus::Expired;
        items[pos].updated_at = now;
        save_all(root, &items)?;
        return Err(KnsError::ApprovalExpired(id.to_string()));
    }

    items[pos].status = ApprovalStatus::Rejected;
    items[pos].updated_at = now;

    let rejected = items[pos].clone();
    save_all(root, &items)?;

    Ok(rejected)
}

/// Mark the request as read by its consumer. Idempotent.
pub fn mark_read(root: &Path, id: &str) -> Result<ActionApproval> {
    let mut items = load_all(root)?;
    let pos = items
        .iter()
        .position(|a| a.id == id)
        .ok_or_else(|| KnsError::ApprovalNotFound(id.to_string()))?;

    if !items[pos].read {
        items[pos].read = true;
        items[pos].updated_at = Utc::now();
        save_all(root, &items)?;
    }

    Ok(items[pos].clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
