use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use kns_core::approval::ActionApproval;
use kns_core::notification::NotificationKind;
use kns_core::KnsError;
use serde::Deserialize;
use uuid::Uuid;

use crate::email::{approval_request_email, Mailer};
use crate::error::AppError;
use crate::state::AppState;
use crate::token;

// ---------------------------------------------------------------------------
// List / show
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ListQuery {
    /// Status filter: pending, approved, rejected, expired, or all.
    pub status: Option<String>,
}

/// GET /api/approvals?status=pending
pub async fn list_approvals(
    State(app): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let items = kns_core::approval::list(&root, query.status.as_deref())?;
        let list: Vec<serde_json::Value> = items.iter().map(approval_to_json).collect();
        Ok::<_, KnsError>(serde_json::json!(list))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

/// GET /api/approvals/:id
pub async fn get_approval(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let approval = kns_core::approval::get(&root, &id)?;
        Ok::<_, KnsError>(approval_to_json(&approval))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateBody {
    pub new_leader: Uuid,
    pub created_by: Option<Uuid>,
}

/// POST /api/approvals — open a promotion request, email the signed
/// confirmation links to the consumer-group leader, and drop an in-app
/// notification for them.
pub async fn create_approval(
    State(app): State<AppState>,
    Json(body): Json<CreateBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let base_url = app.base_url.clone();
    let mailer = app.mailer.clone();
    let result = tokio::task::spawn_blocking(move || {
        let approval = submit_request(
            &root,
            &base_url,
            mailer.as_ref(),
            body.new_leader,
            body.created_by,
        )?;
        Ok::<_, KnsError>(approval_to_json(&approval))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Decide
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct DecisionBody {
    pub actor: Uuid,
}

/// POST /api/approvals/:id/approve
pub async fn approve_approval(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    decide(app, id, body.actor, true).await
}

/// POST /api/approvals/:id/reject
pub async fn reject_approval(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    decide(app, id, body.actor, false).await
}

async fn decide(
    app: AppState,
    id: String,
    actor: Uuid,
    approve: bool,
) -> Result<Json<serde_json::Value>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let now = Utc::now();
        let approval = kns_core::approval::get(&root, &id)?;
        if !kns_core::approval::can_decide(&root, &approval, actor)? {
            return Err(KnsError::NotPermitted {
                id: id.clone(),
                actor: actor.to_string(),
            });
        }
        let decided = if approve {
            kns_core::approval::approve(&root, &id, actor, now)?
        } else {
            kns_core::approval::reject(&root, &id, actor, now)?
        };
        notify_decision(&root, &decided, approve, actor)?;
        Ok::<_, KnsError>(approval_to_json(&decided))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Read flag
// ---------------------------------------------------------------------------

/// POST /api/approvals/:id/read
pub async fn mark_approval_read(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let approval = kns_core::approval::mark_read(&root, &id)?;
        Ok::<_, KnsError>(approval_to_json(&approval))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// Open an approval request and fan out the side effects: the email with
/// signed approve/reject links to the consumer-group leader, and an
/// in-app notification for the same leader. A mailer failure is logged
/// and does not fail the request; the approval is already on disk.
pub(crate) fn submit_request(
    root: &std::path::Path,
    base_url: &str,
    mailer: &dyn Mailer,
    new_leader: Uuid,
    created_by: Option<Uuid>,
) -> kns_core::Result<ActionApproval> {
    let settings = kns_core::settings::load_or_default(root)?;
    let now = Utc::now();
    let approval = kns_core::approval::request(root, new_leader, created_by, &settings, now)?;

    let slug = approval
        .consumer_group
        .clone()
        .unwrap_or_default();
    let group = kns_core::group::get(root, &slug)?;
    let consumer = kns_core::profile::get(root, group.leader)?;
    let member = kns_core::profile::get(root, new_leader)?;
    let requester_name = match created_by {
        Some(id) => kns_core::profile::get(root, id)?.full_name(),
        None => "A group member".to_string(),
    };

    let secret = token::load_or_create_secret(root).map_err(|e| {
        KnsError::Io(std::io::Error::other(format!("signing secret: {e}")))
    })?;
    let link_token = token::sign(&secret, &approval.id, group.leader, now);
    let approve_url = format!(
        "{base_url}/approve/{}/{}/{link_token}",
        approval.id, group.leader
    );
    let reject_url = format!(
        "{base_url}/reject/{}/{}/{link_token}",
        approval.id, group.leader
    );

    let email = approval_request_email(
        &member,
        &requester_name,
        &consumer,
        &group,
        &approve_url,
        &reject_url,
    );
    if let Err(e) = mailer.send(&email) {
        tracing::warn!(approval = %approval.id, error = %e, "approval email not delivered");
    }

    kns_core::notification::notify(
        root,
        created_by,
        NotificationKind::ApprovalRequest,
        format!("Approval needed: make {} a leader", member.full_name()),
        format!(
            "{requester_name} has requested that {} of {} be promoted to a leader role.",
            member.full_name(),
            group.name
        ),
        Some(format!("/api/approvals/{}", approval.id)),
        &[group.leader],
        now,
    )?;

    Ok(approval)
}

/// Tell the requester how their request was decided.
pub(crate) fn notify_decision(
    root: &std::path::Path,
    approval: &ActionApproval,
    approved: bool,
    actor: Uuid,
) -> kns_core::Result<()> {
    let Some(created_by) = approval.created_by else {
        return Ok(());
    };
    let member = kns_core::profile::get(root, approval.action.target())?;
    let (kind, verdict) = if approved {
        (NotificationKind::ApprovalApproved, "approved")
    } else {
        (NotificationKind::ApprovalRejected, "rejected")
    };
    kns_core::notification::notify(
        root,
        Some(actor),
        kind,
        format!("Promotion request {verdict}"),
        format!(
            "Your request to make {} a leader was {verdict}.",
            member.full_name()
        ),
        Some(format!("/api/approvals/{}", approval.id)),
        &[created_by],
        Utc::now(),
    )?;
    Ok(())
}

pub(crate) fn approval_to_json(a: &ActionApproval) -> serde_json::Value {
    serde_json::json!({
        "id": a.id,
        "action": a.action,
        "status": a.status.to_string(),
        "created_by": a.created_by,
        "consumer_group": a.consumer_group,
        "read": a.read,
        "timeout_seconds": a.timeout_seconds,
        "deadline": a.deadline(),
        "approved_by": a.approved_by,
        "approved_at": a.approved_at,
        "created_at": a.created_at,
        "updated_at": a.updated_at,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
