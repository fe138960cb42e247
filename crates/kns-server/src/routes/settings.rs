use axum::{extract::State, Json};
use kns_core::settings::Setting;
use kns_core::KnsError;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/settings
pub async fn get_settings(State(app): State<AppState>) -> Result<Json<Setting>, AppError> {
    let root = app.root.clone();
    let settings = tokio::task::spawn_blocking(move || {
        Ok::<_, KnsError>(kns_core::settings::load_or_default(&root)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(settings))
}

/// PUT /api/settings — replace the site-wide settings.
pub async fn put_settings(
    State(app): State<AppState>,
    Json(body): Json<Setting>,
) -> Result<Json<Setting>, AppError> {
    let root = app.root.clone();
    let settings = tokio::task::spawn_blocking(move || {
        kns_core::settings::save(&root, &body)?;
        Ok::<_, KnsError>(body)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(settings))
}
