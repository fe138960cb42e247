use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use kns_core::notification::{group_by_period, Notification};
use kns_core::KnsError;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct InboxQuery {
    pub recipient: Uuid,
}

/// GET /api/notifications?recipient=... — the recipient's inbox, newest
/// first, bucketed by age ("Today", "Yesterday", "This week", "Earlier").
/// Empty buckets are omitted.
pub async fn list_notifications(
    State(app): State<AppState>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let items = kns_core::notification::list_for(&root, query.recipient)?;
        let grouped = group_by_period(&items, Utc::now());
        let sections: Vec<serde_json::Value> = grouped
            .iter()
            .map(|(period, bucket)| {
                serde_json::json!({
                    "period": period.label(),
                    "notifications": bucket
                        .iter()
                        .map(|n| notification_to_json(n, query.recipient))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        Ok::<_, KnsError>(serde_json::json!(sections))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct ReadBody {
    pub recipient: Uuid,
}

/// POST /api/notifications/:id/read
pub async fn mark_notification_read(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReadBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let notification =
            kns_core::notification::mark_read(&root, &id, body.recipient, Utc::now())?;
        Ok::<_, KnsError>(notification_to_json(&notification, body.recipient))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

fn notification_to_json(n: &Notification, recipient: Uuid) -> serde_json::Value {
    let row = n.recipient_row(recipient);
    serde_json::json!({
        "id": n.id,
        "sender": n.sender,
        "kind": n.kind.to_string(),
        "title": n.title,
        "message": n.message,
        "link": n.link,
        "is_read": row.map(|r| r.is_read).unwrap_or(false),
        "read_at": row.and_then(|r| r.read_at),
        "created_at": n.created_at,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use kns_core::notification::NotificationKind;

    fn test_state() -> (tempfile::TempDir, AppState, Uuid) {
        let dir = tempfile::TempDir::new().unwrap();
        let recipient = Uuid::new_v4();
        let app = AppState::new(dir.path().to_path_buf());
        (dir, app, recipient)
    }

    #[tokio::test]
    async fn inbox_groups_by_age() {
        let (_dir, app, recipient) = test_state();
        let now = Utc::now();
        kns_core::notification::notify(
            &app.root,
            None,
            NotificationKind::General,
            "Old",
            "From last month",
            None,
            &[recipient],
            now - chrono::Duration::days(30),
        )
        .unwrap();
        kns_core::notification::notify(
            &app.root,
            None,
            NotificationKind::General,
            "Fresh",
            "From today",
            None,
            &[recipient],
            now,
        )
        .unwrap();

        let sections = list_notifications(State(app), Query(InboxQuery { recipient }))
            .await
            .unwrap()
            .0;
        let sections = sections.as_array().unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0]["period"], "Today");
        assert_eq!(sections[0]["notifications"][0]["title"], "Fresh");
        assert_eq!(sections[1]["period"], "Earlier");
        assert_eq!(sections[1]["notifications"][0]["title"], "Old");
    }

    #[tokio::test]
    async fn inbox_is_scoped_to_recipient() {
        let (_dir, app, recipient) = test_state();
        kns_core::notification::notify(
            &app.root,
            None,
            NotificationKind::General,
            "For someone else",
            "",
            None,
            &[Uuid::new_v4()],
            Utc::now(),
        )
        .unwrap();

        let sections = list_notifications(State(app), Query(InboxQuery { recipient }))
            .await
            .unwrap()
            .0;
        assert!(sections.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_read_flips_flag() {
        let (_dir, app, recipient) = test_state();
        let n = kns_core::notification::notify(
            &app.root,
            None,
            NotificationKind::General,
            "Hi",
            "",
            None,
            &[recipient],
            Utc::now(),
        )
        .unwrap();

        let read = mark_notification_read(
            State(app),
            Path(n.id.clone()),
            Json(ReadBody { recipient }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(read["is_read"], true);
        assert!(read["read_at"].is_string());
    }

    #[tokio::test]
    async fn concurrent_mark_read_keeps_both_recipients() {
        // Two recipients flipping their rows at once must not clobber
        // each other's load-modify-write on the store file.
        let (_dir, app, _) = test_state();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let n = kns_core::notification::notify(
            &app.root,
            None,
            NotificationKind::General,
            "Hi",
            "",
            None,
            &[a, b],
            Utc::now(),
        )
        .unwrap();

        let read_a = mark_notification_read(
            State(app.clone()),
            Path(n.id.clone()),
            Json(ReadBody { recipient: a }),
        );
        let read_b = mark_notification_read(
            State(app.clone()),
            Path(n.id.clone()),
            Json(ReadBody { recipient: b }),
        );
        let (ra, rb) = tokio::join!(read_a, read_b);
        ra.unwrap();
        rb.unwrap();

        let reloaded = kns_core::notification::get(&app.root, &n.id).unwrap();
        assert!(reloaded.recipient_row(a).unwrap().is_read);
        assert!(reloaded.recipient_row(b).unwrap().is_read);
    }

    #[tokio::test]
    async fn non_recipient_cannot_mark_read() {
        let (_dir, app, recipient) = test_state();
        let n = kns_core::notification::notify(
            &app.root,
            None,
            NotificationKind::General,
            "Hi",
            "",
            None,
            &[recipient],
            Utc::now(),
        )
        .unwrap();

        let err = mark_notification_read(
            State(app),
            Path(n.id.clone()),
            Json(ReadBody {
                recipient: Uuid::new_v4(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
