use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::approvals::{approval_to_json, submit_request};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/profiles — all profiles
pub async fn list_profiles(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let profiles = kns_core::profile::list(&root)?;
        let list: Vec<serde_json::Value> = profiles.iter().map(profile_to_json).collect();
        Ok::<_, kns_core::KnsError>(serde_json::json!(list))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Show
// ---------------------------------------------------------------------------

/// GET /api/profiles/:id — single profile
pub async fn get_profile(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let profile = kns_core::profile::get(&root, id)?;
        Ok::<_, kns_core::KnsError>(profile_to_json(&profile))
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
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// POST /api/profiles — create a profile with the member role
pub async fn create_profile(
    State(app): State<AppState>,
    Json(body): Json<CreateBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let settings = kns_core::settings::load_or_default(&root)?;
        let profile = kns_core::profile::create(
            &root,
            &body.first_name,
            &body.last_name,
            &body.email,
            &settings,
        )?;
        Ok::<_, kns_core::KnsError>(profile_to_json(&profile))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Promote
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PromoteBody {
    /// Profile initiating the promotion.
    pub requested_by: Option<Uuid>,
}

/// POST /api/profiles/:id/promote — promote to leader, or open an
/// approval request when the initiator's group requires one.
pub async fn promote_profile(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PromoteBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let base_url = app.base_url.clone();
    let mailer = app.mailer.clone();
    let result = tokio::task::spawn_blocking(move || {
        let settings = kns_core::settings::load_or_default(&root)?;

        let needs_approval = match body.requested_by {
            Some(initiator) => kns_core::approval::requires_approval(&root, initiator, &settings)?,
            None => false,
        };

        if needs_approval {
            let approval = submit_request(&root, &base_url, mailer.as_ref(), id, body.requested_by)?;
            Ok::<_, kns_core::KnsError>(serde_json::json!({
                "status": "approval_required",
                "approval": approval_to_json(&approval),
            }))
        } else {
            let profile = kns_core::profile::make_leader(&root, id)?;
            Ok::<_, kns_core::KnsError>(serde_json::json!({
                "status": "promoted",
                "profile": profile_to_json(&profile),
            }))
        }
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

pub(crate) fn profile_to_json(p: &kns_core::profile::Profile) -> serde_json::Value {
    serde_json::json!({
        "id": p.id,
        "first_name": p.first_name,
        "last_name": p.last_name,
        "full_name": p.full_name(),
        "email": p.email,
        "role": p.role.to_string(),
        "contact_visible": p.contact_visible,
        "created_at": p.created_at,
        "updated_at": p.updated_at,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
