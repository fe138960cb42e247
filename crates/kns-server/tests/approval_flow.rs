//! End-to-end promotion approval flow over the HTTP surface: open a
//! request, follow the emailed confirmation link, and observe the
//! promotion plus the notification fan-out.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use kns_server::email::RecordingMailer;
use kns_server::AppState;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const BASE_URL: &str = "http://testserver";

async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, String) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let (status, text) = send(app, method, uri, body).await;
    let json = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn create_profile(app: &Router, first: &str, last: &str, email: &str) -> Uuid {
    let (status, profile) = send_json(
        app,
        "POST",
        "/api/profiles",
        Some(serde_json::json!({
            "first_name": first,
            "last_name": last,
            "email": email,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    profile["id"].as_str().unwrap().parse().unwrap()
}

struct Setup {
    _dir: tempfile::TempDir,
    app: Router,
    mailer: Arc<RecordingMailer>,
    north_leader: Uuid,
    member: Uuid,
    requester: Uuid,
}

async fn setup() -> Setup {
    let dir = tempfile::TempDir::new().unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::with_mailer(dir.path().to_path_buf(), mailer.clone())
        .with_base_url(BASE_URL);
    let app = kns_server::router(state);

    let origin_leader = create_profile(&app, "Paul", "Origin", "paul@example.com").await;
    let north_leader = create_profile(&app, "Grace", "North", "grace@example.com").await;
    let member = create_profile(&app, "Sam", "Otieno", "sam@example.com").await;
    let requester = create_profile(&app, "Ruth", "Achieng", "ruth@example.com").await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/groups",
        Some(serde_json::json!({
            "slug": "origin",
            "name": "Origin",
            "leader": origin_leader,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/groups",
        Some(serde_json::json!({
            "slug": "north",
            "name": "North Group",
            "leader": north_leader,
            "parent": "origin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for profile in [member, requester] {
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/groups/north/members",
            Some(serde_json::json!({ "profile": profile })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    Setup {
        _dir: dir,
        app,
        mailer,
        north_leader,
        member,
        requester,
    }
}

/// Pull the path of the first link matching `marker` out of the most
/// recent email.
fn emailed_link(mailer: &RecordingMailer, marker: &str) -> String {
    let sent = mailer.sent.lock().unwrap();
    let html = &sent.last().expect("an email was sent").html;
    let url = html
        .split("href=\"")
        .find(|part| part.starts_with(BASE_URL) && part.contains(marker))
        .and_then(|part| part.split('"').next())
        .expect("link present in email");
    url.strip_prefix(BASE_URL).unwrap().to_string()
}

#[tokio::test]
async fn promotion_approved_via_email_link() {
    let s = setup().await;

    // The requester asks for the member's promotion; the group requires
    // its leader's consent.
    let (status, body) = send_json(
        &s.app,
        "POST",
        &format!("/api/profiles/{}/promote", s.member),
        Some(serde_json::json!({ "requested_by": s.requester })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approval_required");
    assert_eq!(body["approval"]["id"], "A1");
    assert_eq!(body["approval"]["status"], "pending");

    // The leader got the email and an in-app notification.
    assert_eq!(s.mailer.sent.lock().unwrap().len(), 1);
    let (status, inbox) = send_json(
        &s.app,
        "GET",
        &format!("/api/notifications?recipient={}", s.north_leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox[0]["period"], "Today");
    assert_eq!(inbox[0]["notifications"][0]["kind"], "approval_request");

    // Following the approve link promotes the member.
    let approve_path = emailed_link(&s.mailer, "/approve/");
    let (status, page) = send(&s.app, "GET", &approve_path, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Sam Otieno is now a leader."));

    let (_, profile) = send_json(&s.app, "GET", &format!("/api/profiles/{}", s.member), None).await;
    assert_eq!(profile["role"], "leader");

    // The link is single-use.
    let (status, page) = send(&s.app, "GET", &approve_path, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("already been handled"));

    // The requester hears back.
    let (_, inbox) = send_json(
        &s.app,
        "GET",
        &format!("/api/notifications?recipient={}", s.requester),
        None,
    )
    .await;
    assert_eq!(inbox[0]["notifications"][0]["kind"], "approval_approved");
}

#[tokio::test]
async fn promotion_rejected_via_email_link() {
    let s = setup().await;

    send_json(
        &s.app,
        "POST",
        &format!("/api/profiles/{}/promote", s.member),
        Some(serde_json::json!({ "requested_by": s.requester })),
    )
    .await;

    let reject_path = emailed_link(&s.mailer, "/reject/");
    let (status, page) = send(&s.app, "GET", &reject_path, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("rejected"));

    let (_, profile) = send_json(&s.app, "GET", &format!("/api/profiles/{}", s.member), None).await;
    assert_eq!(profile["role"], "member");

    let (_, approval) = send_json(&s.app, "GET", "/api/approvals/A1", None).await;
    assert_eq!(approval["status"], "rejected");
}

#[tokio::test]
async fn tampered_link_is_rejected_with_400() {
    let s = setup().await;

    send_json(
        &s.app,
        "POST",
        &format!("/api/profiles/{}/promote", s.member),
        Some(serde_json::json!({ "requested_by": s.requester })),
    )
    .await;

    let approve_path = emailed_link(&s.mailer, "/approve/");
    let forged = format!("{approve_path}x");
    let (status, _) = send(&s.app, "GET", &forged, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, approval) = send_json(&s.app, "GET", "/api/approvals/A1", None).await;
    assert_eq!(approval["status"], "pending");
}

#[tokio::test]
async fn promotion_is_direct_when_approval_not_required() {
    let s = setup().await;

    // Turn the approval requirement off site-wide.
    let (status, _) = send_json(
        &s.app,
        "PUT",
        "/api/settings",
        Some(serde_json::json!({
            "change_role_approval_required": false,
            "approval_timeout_days": 7,
            "max_skills_per_user": 5,
            "default_contact_visibility": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &s.app,
        "POST",
        &format!("/api/profiles/{}/promote", s.member),
        Some(serde_json::json!({ "requested_by": s.requester })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "promoted");
    assert_eq!(body["profile"]["role"], "leader");
    assert!(s.mailer.sent.lock().unwrap().is_empty());
}
