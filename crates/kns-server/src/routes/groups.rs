use axum::{
    extract::{Path, State},
    Json,
};
use kns_core::group::Group;
use kns_core::KnsError;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/groups
pub async fn list_groups(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let groups = kns_core::group::list(&root)?;
        let list: Vec<serde_json::Value> = groups.iter().map(group_to_json).collect();
        Ok::<_, KnsError>(serde_json::json!(list))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

/// GET /api/groups/:slug
pub async fn get_group(
    State(app): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let group = kns_core::group::get(&root, &slug)?;
        Ok::<_, KnsError>(group_to_json(&group))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct CreateBody {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub leader: Uuid,
    pub parent: Option<String>,
}

/// POST /api/groups
pub async fn create_group(
    State(app): State<AppState>,
    Json(body): Json<CreateBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let group = kns_core::group::create(
            &root,
            &body.slug,
            body.name,
            body.description,
            body.leader,
            body.parent.as_deref(),
        )?;
        Ok::<_, KnsError>(group_to_json(&group))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct AddMemberBody {
    pub profile: Uuid,
}

/// POST /api/groups/:slug/members
pub async fn add_group_member(
    State(app): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<AddMemberBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let group = kns_core::group::add_member(&root, &slug, body.profile)?;
        Ok::<_, KnsError>(group_to_json(&group))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

pub(crate) fn group_to_json(g: &Group) -> serde_json::Value {
    serde_json::json!({
        "slug": g.slug,
        "name": g.name,
        "description": g.description,
        "leader": g.leader,
        "parent": g.parent,
        "is_origin": g.is_origin(),
        "members": g.members.iter().map(|m| serde_json::json!({
            "profile": m.profile,
            "joined_at": m.joined_at,
        })).collect::<Vec<_>>(),
        "created_at": g.created_at,
        "updated_at": g.updated_at,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
