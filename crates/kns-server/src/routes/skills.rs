use axum::{
    extract::{Path, State},
    Json,
};
use kns_core::KnsError;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/profiles/:id/skills
pub async fn get_skills(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let skills = kns_core::skill::get(&root, id)?;
        Ok::<_, KnsError>(serde_json::json!({ "profile": id, "skills": skills }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct PutBody {
    pub skills: Vec<String>,
}

/// PUT /api/profiles/:id/skills — replace the profile's skill list,
/// bounded by the max_skills_per_user setting.
pub async fn put_skills(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PutBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let settings = kns_core::settings::load_or_default(&root)?;
        let record = kns_core::skill::set(&root, id, body.skills, &settings)?;
        Ok::<_, KnsError>(serde_json::json!({ "profile": id, "skills": record.skills }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}
