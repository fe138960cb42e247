use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kns_core::KnsError;

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<KnsError>() {
            match e {
                KnsError::NotInitialized => StatusCode::BAD_REQUEST,
                KnsError::ProfileNotFound(_)
                | KnsError::GroupNotFound(_)
                | KnsError::ApprovalNotFound(_)
                | KnsError::NotificationNotFound(_)
                | KnsError::NotARecipient { .. } => StatusCode::NOT_FOUND,
                KnsError::ProfileEmailExists(_)
                | KnsError::GroupExists(_)
                | KnsError::AlreadyGroupMember { .. }
                | KnsError::AlreadyProcessed(_) => StatusCode::CONFLICT,
                KnsError::ApprovalExpired(_) => StatusCode::GONE,
                KnsError::NotPermitted { .. } => StatusCode::FORBIDDEN,
                KnsError::InvalidSlug(_)
                | KnsError::InvalidRole(_)
                | KnsError::InvalidApprovalStatus(_)
                | KnsError::InvalidNotificationKind(_)
                | KnsError::InvalidSetting(_) => StatusCode::BAD_REQUEST,
                KnsError::NotAGroupMember(_) | KnsError::SkillLimitReached(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                KnsError::Io(_) | KnsError::Yaml(_) | KnsError::Json(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
