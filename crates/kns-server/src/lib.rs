//! HTTP server for the nurturing suite.
//!
//! JSON endpoints live under `/api`; the approve/reject confirmation
//! pages linked from emails live at the root so they stay short enough
//! for mail clients.

pub mod email;
pub mod error;
pub mod routes;
pub mod state;
pub mod token;

use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};

pub use state::AppState;

/// Build the router with a default state rooted at `root`.
pub fn build_router(root: PathBuf) -> Router {
    router(AppState::new(root))
}

/// Build the router from explicit state. Tests use this with a
/// recording mailer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/profiles",
            get(routes::profiles::list_profiles).post(routes::profiles::create_profile),
        )
        .route("/api/profiles/{id}", get(routes::profiles::get_profile))
        .route(
            "/api/profiles/{id}/promote",
            post(routes::profiles::promote_profile),
        )
        .route(
            "/api/profiles/{id}/skills",
            get(routes::skills::get_skills).put(routes::skills::put_skills),
        )
        .route(
            "/api/groups",
            get(routes::groups::list_groups).post(routes::groups::create_group),
        )
        .route("/api/groups/{slug}", get(routes::groups::get_group))
        .route(
            "/api/groups/{slug}/members",
            post(routes::groups::add_group_member),
        )
        .route(
            "/api/approvals",
            get(routes::approvals::list_approvals).post(routes::approvals::create_approval),
        )
        .route("/api/approvals/{id}", get(routes::approvals::get_approval))
        .route(
            "/api/approvals/{id}/approve",
            post(routes::approvals::approve_approval),
        )
        .route(
            "/api/approvals/{id}/reject",
            post(routes::approvals::reject_approval),
        )
        .route(
            "/api/approvals/{id}/read",
            post(routes::approvals::mark_approval_read),
        )
        .route(
            "/api/notifications",
            get(routes::notifications::list_notifications),
        )
        .route(
            "/api/notifications/{id}/read",
            post(routes::notifications::mark_notification_read),
        )
        .route(
            "/api/settings",
            get(routes::settings::get_settings).put(routes::settings::put_settings),
        )
        .route(
            "/approve/{id}/{actor}/{token}",
            get(routes::confirm::confirm_approve),
        )
        .route(
            "/reject/{id}/{actor}/{token}",
            get(routes::confirm::confirm_reject),
        )
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Bind and serve until shutdown. `base_url` overrides the URL used in
/// emailed confirmation links; it defaults to localhost on `port`.
pub async fn serve(root: PathBuf, port: u16, base_url: Option<String>) -> anyhow::Result<()> {
    let base_url = base_url.unwrap_or_else(|| format!("http://localhost:{port}"));
    let state = AppState::new(root).with_base_url(base_url);
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("kns server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
