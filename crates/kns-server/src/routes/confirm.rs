//! Email confirmation endpoints.
//!
//! The links mailed to a consumer-group leader land here. They are plain
//! GET endpoints returning small HTML pages, so they work from any mail
//! client. The signed token in the path is the only credential: an
//! invalid or expired token yields a 400 page and never mutates state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::email::escape_html;
use crate::error::AppError;
use crate::routes::approvals::notify_decision;
use crate::state::AppState;
use crate::token;

/// GET /approve/:id/:actor/:token
pub async fn confirm_approve(
    State(app): State<AppState>,
    Path((id, actor, link_token)): Path<(String, Uuid, String)>,
) -> Result<(StatusCode, Html<String>), AppError> {
    confirm(app, id, actor, link_token, true).await
}

/// GET /reject/:id/:actor/:token
pub async fn confirm_reject(
    State(app): State<AppState>,
    Path((id, actor, link_token)): Path<(String, Uuid, String)>,
) -> Result<(StatusCode, Html<String>), AppError> {
    confirm(app, id, actor, link_token, false).await
}

async fn confirm(
    app: AppState,
    id: String,
    actor: Uuid,
    link_token: String,
    approve: bool,
) -> Result<(StatusCode, Html<String>), AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let (status, html) = tokio::task::spawn_blocking(move || {
        let secret = token::load_or_create_secret(&root)?;

        let approval = match kns_core::approval::get(&root, &id) {
            Ok(a) => a,
            Err(kns_core::KnsError::ApprovalNotFound(_)) => return Ok(invalid_page()),
            Err(e) => return Err(e.into()),
        };

        let max_age = Duration::seconds(approval.timeout_seconds);
        let now = Utc::now();
        if token::verify(&secret, &link_token, &id, actor, now, max_age).is_err() {
            return Ok(invalid_page());
        }
        if !kns_core::approval::can_decide(&root, &approval, actor)? {
            return Ok((
                StatusCode::BAD_REQUEST,
                page("Not permitted", "You cannot complete this action."),
            ));
        }

        let outcome = if approve {
            kns_core::approval::approve(&root, &id, actor, now)
        } else {
            kns_core::approval::reject(&root, &id, actor, now)
        };
        let body = match outcome {
            Ok(decided) => {
                notify_decision(&root, &decided, approve, actor)?;
                let member = kns_core::profile::get(&root, decided.action.target())?;
                let member_name = escape_html(&member.full_name());
                if approve {
                    page(
                        "Request approved",
                        &format!("{member_name} is now a leader."),
                    )
                } else {
                    page(
                        "Request rejected",
                        &format!(
                            "You have rejected the request to make {member_name} a leader."
                        ),
                    )
                }
            }
            Err(kns_core::KnsError::AlreadyProcessed(_)) => page(
                "Already handled",
                "This request has already been handled.",
            ),
            Err(kns_core::KnsError::ApprovalExpired(_)) => {
                page("Request expired", "This request is no longer valid.")
            }
            Err(e) => return Err(e.into()),
        };
        Ok::<_, anyhow::Error>((StatusCode::OK, body))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok((status, Html(html)))
}

fn invalid_page() -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        page("Invalid link", "This request is no longer valid."),
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        concat!(
            "<!doctype html><html><head><title>{title}</title></head>",
            "<body style=\"font-family:sans-serif;margin:3em auto;max-width:30em\">",
            "<h1>{title}</h1><p>{body}</p>",
            "</body></html>",
        ),
        title = title,
        body = body,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
