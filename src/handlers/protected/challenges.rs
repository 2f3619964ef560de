use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Extension;
use chrono::Utc;
use serde_json::Value;

use crate::database::models::challenge::RegisterForChallenge;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::notifications::Notification;
use crate::services::{ChallengeService, ProjectService};
use crate::state::AppState;

/// POST /api/challenges/:id/register
///
/// The body is optional; `project_id` must name one of the caller's projects.
pub async fn register(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Challenge")?;
    let project_id = registration_body(&body)?.project_id;

    if let Some(project_id) = project_id {
        let project = ProjectService::new(state.pool.clone())
            .find(project_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))?;
        if project.builder_id != caller.id() {
            return Err(ApiError::forbidden("You can only enter your own projects"));
        }
    }

    let challenge = ChallengeService::new(state.pool.clone())
        .register(id, caller.id(), project_id, Utc::now())
        .await?;

    state.notifications.enqueue(Notification::ChallengeRegistered {
        to: caller.0.email.clone(),
        name: caller.0.name.clone(),
        challenge_title: challenge.title.clone(),
        end_date: challenge.end_date,
    });

    Ok(ApiResponse::message("Successfully registered for challenge"))
}

/// An empty body registers without a project; anything else must parse.
fn registration_body(body: &[u8]) -> Result<RegisterForChallenge, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RegisterForChallenge::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

/// DELETE /api/challenges/:id/register
pub async fn unregister(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Challenge")?;
    ChallengeService::new(state.pool.clone())
        .unregister(id, caller.id())
        .await?;
    Ok(ApiResponse::message("Registration cancelled"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_means_no_project() {
        assert!(registration_body(b"").unwrap().project_id.is_none());
        assert!(registration_body(b"  \n").unwrap().project_id.is_none());
        assert!(registration_body(b"{}").unwrap().project_id.is_none());
    }

    #[test]
    fn malformed_project_id_is_rejected() {
        let err = registration_body(br#"{"project_id":"not-a-uuid"}"#).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.message().starts_with("Invalid request body"));
        assert!(registration_body(b"{not json").is_err());
    }

    #[test]
    fn project_id_is_read() {
        let id = uuid::Uuid::new_v4();
        let body = format!(r#"{{"project_id":"{}"}}"#, id);
        assert_eq!(registration_body(body.as_bytes()).unwrap().project_id, Some(id));
    }
}
