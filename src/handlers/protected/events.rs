use axum::extract::{Path, State};
use axum::Extension;
use chrono::Utc;
use serde_json::Value;

use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::notifications::Notification;
use crate::services::EventService;
use crate::state::AppState;

/// POST /api/events/:id/register
pub async fn register(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Event")?;
    let event = EventService::new(state.pool.clone())
        .register(id, caller.id(), Utc::now())
        .await?;

    state.notifications.enqueue(Notification::EventRegistered {
        to: caller.0.email.clone(),
        name: caller.0.name.clone(),
        event_title: event.title.clone(),
        start_time: event.start_time,
        meeting_url: event.meeting_url.clone(),
    });

    Ok(ApiResponse::message("Successfully registered for event"))
}

/// DELETE /api/events/:id/register
pub async fn unregister(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Event")?;
    EventService::new(state.pool.clone()).unregister(id, caller.id()).await?;
    Ok(ApiResponse::message("Registration cancelled"))
}
