//! In-app notifications with per-recipient read state.
//!
//! Layout:
//!   .kns/notifications.yaml   — list of all notifications
//!
//! IDs are sequential: N1, N2, N3, …
//! A notification is created once, fans out to one recipient row per
//! affected user, and is only ever mutated to flip a recipient's
//! `is_read` flag.

use crate::error::{KnsError, Result};
use crate::io;
use crate::paths;
use crate::types::Timestamped;
use chrono::{DateTime, Days, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApprovalRequest,
    ApprovalApproved,
    ApprovalRejected,
    General,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::ApprovalRequest => "approval_request",
            NotificationKind::ApprovalApproved => "approval_approved",
            NotificationKind::ApprovalRejected => "approval_rejected",
            NotificationKind::General => "general",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = KnsError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approval_request" => Ok(NotificationKind::ApprovalRequest),
            "approval_approved" => Ok(NotificationKind::ApprovalApproved),
            "approval_rejected" => Ok(NotificationKind::ApprovalRejected),
            "general" => Ok(NotificationKind::General),
            _ => Err(KnsError::InvalidNotificationKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecipient {
    pub recipient: Uuid,
    #[serde(default)]
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub recipients: Vec<NotificationRecipient>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn recipient_row(&self, recipient: Uuid) -> Option<&NotificationRecipient> {
        self.recipients.iter().find(|r| r.recipient == recipient)
    }
}

impl Timestamped for Notification {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// ---------------------------------------------------------------------------
// Period grouping
// ---------------------------------------------------------------------------

/// Coarse recency bucket for display. Every item falls in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    Yesterday,
    ThisWeek,
    Earlier,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Today,
        Period::Yesterday,
        Period::ThisWeek,
        Period::Earlier,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::Today => "Today",
            Period::Yesterday => "Yesterday",
            Period::ThisWeek => "This week",
            Period::Earlier => "Earlier",
        }
    }

    /// Classify a creation time relative to `now`. Future-dated items
    /// (clock skew) count as today.
    pub fn of(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Period {
        let date = created_at.date_naive();
        let today = now.date_naive();
        if date >= today {
            return Period::Today;
        }
        if Some(date) == today.checked_sub_days(Days::new(1)) {
            return Period::Yesterday;
        }
        if now - created_at < Duration::days(7) {
            return Period::ThisWeek;
        }
        Period::Earlier
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Partition items into period buckets ordered `Today` → `Earlier`.
///
/// Total: every item lands in exactly one bucket, input order preserved
/// within a bucket. Empty buckets are omitted.
pub fn group_by_period<T: Timestamped>(items: &[T], now: DateTime<Utc>) -> Vec<(Period, Vec<&T>)> {
    let mut buckets: Vec<(Period, Vec<&T>)> = Period::ALL.iter().map(|p| (*p, Vec::new())).collect();
    for item in items {
        let period = Period::of(item.created_at(), now);
        let slot = buckets
            .iter_mut()
            .find(|(p, _)| *p == period)
            .expect("every period has a bucket");
        slot.1.push(item);
    }
    buckets.retain(|(_, items)| !items.is_empty());
    buckets
}

// ---------------------------------------------------------------------------
// Internal file I/O
// ---------------------------------------------------------------------------

fn load_all(root: &Path) -> Result<Vec<Notification>> {
    let path = paths::notifications_path(root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(&content)?)
}

fn save_all(root: &Path, items: &[Notification]) -> Result<()> {
    let content = serde_yaml::to_string(items)?;
    io::atomic_write(&paths::notifications_path(root), content.as_bytes())
}

fn next_id(items: &[Notification]) -> String {
    let n = items.len() + 1;
    format!("N{n}")
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Create one notification with an unread recipient row per recipient.
#[allow(clippy::too_many_arguments)]
pub fn notify(
    root: &Path,
    sender: Option<Uuid>,
    kind: NotificationKind,
    title: impl Into<String>,
    message: impl Into<String>,
    link: Option<String>,
    recipients: &[Uuid],
    now: DateTime<Utc>,
) -> Result<Notification> {
    let mut items = load_all(root)?;
    let id = next_id(&items);

    let notification = Notification {
        id,
        sender,
        kind,
        title: title.into(),
        message: message.into(),
        link,
        recipients: recipients
            .iter()
            .map(|r| NotificationRecipient {
                recipient: *r,
                is_read: false,
                read_at: None,
            })
            .collect(),
        created_at: now,
        updated_at: now,
    };

    items.push(notification.clone());
    save_all(root, &items)?;

    Ok(notification)
}

/// Notifications addressed to `recipient`, most recent first.
pub fn list_for(root: &Path, recipient: Uuid) -> Result<Vec<Notification>> {
    let mut items: Vec<Notification> = load_all(root)?
        .into_iter()
        .filter(|n| n.recipient_row(recipient).is_some())
        .collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(items)
}

pub fn get(root: &Path, id: &str) -> Result<Notification> {
    let items = load_all(root)?;
    items
        .into_iter()
        .find(|n| n.id == id)
        .ok_or_else(|| KnsError::NotificationNotFound(id.to_string()))
}

/// Mark a recipient's row as read. Idempotent: a second call leaves
/// `read_at` from the first.
pub fn mark_read(
    root: &Path,
    id: &str,
    recipient: Uuid,
    now: DateTime<Utc>,
) -> Result<Notification> {
    let mut items = load_all(root)?;
    let pos = items
        .iter()
        .position(|n| n.id == id)
        .ok_or_else(|| KnsError::NotificationNotFound(id.to_string()))?;

    let row = items[pos]
        .recipients
        .iter_mut()
        .find(|r| r.recipient == recipient)
        .ok_or_else(|| KnsError::NotARecipient {
            id: id.to_string(),
            recipient: recipient.to_string(),
        })?;

    if !row.is_read {
        row.is_read = true;
        row.read_at = Some(now);
        items[pos].updated_at = now;
        save_all(root, &items)?;
    }

    Ok(items[pos].clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn send(
        root: &Path,
        title: &str,
        recipients: &[Uuid],
        now: DateTime<Utc>,
    ) -> Notification {
        notify(
            root,
            None,
            NotificationKind::General,
            title,
            "body",
            None,
            recipients,
            now,
        )
        .unwrap()
    }

    #[test]
    fn notify_creates_unread_rows_per_recipient() {
        let dir = tempfile::TempDir::new().unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let n = send(dir.path(), "Hello", &[a, b], Utc::now());

        assert_eq!(n.id, "N1");
        assert_eq!(n.recipients.len(), 2);
        assert!(n.recipients.iter().all(|r| !r.is_read));
        assert!(n.recipients.iter().all(|r| r.read_at.is_none()));
    }

    #[test]
    fn list_for_filters_and_orders_most_recent_first() {
        let dir = tempfile::TempDir::new().unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let t0 = Utc::now();
        send(dir.path(), "older", &[a], t0 - Duration::hours(2));
        send(dir.path(), "newer", &[a], t0);
        send(dir.path(), "other", &[b], t0);

        let for_a = list_for(dir.path(), a).unwrap();
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[0].title, "newer");
        assert_eq!(for_a[1].title, "older");
    }

    #[test]
    fn mark_read_sets_read_at_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = Uuid::new_v4();
        let n = send(dir.path(), "Hello", &[a], Utc::now());

        let t1 = Utc::now();
        let first = mark_read(dir.path(), &n.id, a, t1).unwrap();
        let row = first.recipient_row(a).unwrap();
        assert!(row.is_read);
        assert_eq!(row.read_at, Some(t1));

        // Second call is a no-op: read_at unchanged.
        let t2 = t1 + Duration::minutes(5);
        let second = mark_read(dir.path(), &n.id, a, t2).unwrap();
        assert_eq!(second.recipient_row(a).unwrap().read_at, Some(t1));
    }

    #[test]
    fn mark_read_for_non_recipient_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = Uuid::new_v4();
        let n = send(dir.path(), "Hello", &[a], Utc::now());

        let err = mark_read(dir.path(), &n.id, Uuid::new_v4(), Utc::now()).unwrap_err();
        assert!(matches!(err, KnsError::NotARecipient { .. }));
    }

    #[test]
    fn mark_read_missing_notification_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = mark_read(dir.path(), "N99", Uuid::new_v4(), Utc::now()).unwrap_err();
        assert!(matches!(err, KnsError::NotificationNotFound(_)));
    }

    // -----------------------------------------------------------------------
    // Period grouping
    // -----------------------------------------------------------------------

    #[test]
    fn period_classification() {
        let now = "2026-08-25T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let cases = [
            ("2026-08-25T08:00:00Z", Period::Today),
            ("2026-08-24T23:59:00Z", Period::Yesterday),
            ("2026-08-21T12:00:00Z", Period::ThisWeek),
            ("2026-08-18T13:00:00Z", Period::ThisWeek),
            ("2026-08-18T11:00:00Z", Period::Earlier),
            ("2026-01-01T00:00:00Z", Period::Earlier),
            // Future-dated clamps to Today.
            ("2026-08-26T00:00:00Z", Period::Today),
        ];
        for (ts, expected) in cases {
            let t = ts.parse::<DateTime<Utc>>().unwrap();
            assert_eq!(Period::of(t, now), expected, "for {ts}");
        }
    }

    #[test]
    fn group_by_period_is_total() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = Uuid::new_v4();
        let now = Utc::now();
        send(dir.path(), "today", &[a], now);
        send(dir.path(), "yesterday", &[a], now - Duration::days(1));
        send(dir.path(), "this-week", &[a], now - Duration::days(3));
        send(dir.path(), "earlier", &[a], now - Duration::days(30));

        let items = list_for(dir.path(), a).unwrap();
        let groups = group_by_period(&items, now);

        let total: usize = groups.iter().map(|(_, v)| v.len()).sum();
        assert_eq!(total, items.len(), "no item omitted or duplicated");

        let labels: Vec<&str> = groups.iter().map(|(p, _)| p.label()).collect();
        assert_eq!(labels, ["Today", "Yesterday", "This week", "Earlier"]);
    }

    #[test]
    fn group_by_period_preserves_input_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = Uuid::new_v4();
        let now = Utc::now();
        send(dir.path(), "first", &[a], now - Duration::minutes(1));
        send(dir.path(), "second", &[a], now - Duration::minutes(30));

        // list_for yields most-recent-first; grouping keeps that order.
        let items = list_for(dir.path(), a).unwrap();
        let groups = group_by_period(&items, now);
        assert_eq!(groups.len(), 1);
        let titles: Vec<&str> = groups[0].1.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[test]
    fn group_by_period_empty_input() {
        let items: Vec<Notification> = Vec::new();
        assert!(group_by_period(&items, Utc::now()).is_empty());
    }

    #[test]
    fn kind_roundtrip() {
        for kind in [
            NotificationKind::ApprovalRequest,
            NotificationKind::ApprovalApproved,
            NotificationKind::ApprovalRejected,
            NotificationKind::General,
        ] {
            let parsed: NotificationKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("bogus".parse::<NotificationKind>().is_err());
    }
}
