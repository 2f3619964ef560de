use axum::extract::{Path, State};
use axum::Extension;
use serde_json::Value;

use crate::database::models::event::{CreateEvent, UpdateEvent};
use crate::database::models::Event;
use crate::error::ApiError;
use crate::handlers::elevated::challenges::check_window;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson};
use crate::services::EventService;
use crate::state::AppState;

/// POST /api/events
pub async fn create(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateEvent>,
) -> ApiResult<Event> {
    check_window(body.start_time, body.end_time)?;
    let event = EventService::new(state.pool.clone()).create(admin.id(), &body).await?;
    Ok(ApiResponse::created(event))
}

/// PUT /api/events/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateEvent>,
) -> ApiResult<Event> {
    let id = parse_id(&id, "Event")?;
    let service = EventService::new(state.pool.clone());
    let current = service
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?
        .event;
    check_window(
        body.start_time.unwrap_or(current.start_time),
        body.end_time.unwrap_or(current.end_time),
    )?;

    let event = service.update(id, &body).await?;
    Ok(ApiResponse::success(event))
}

/// DELETE /api/events/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "Event")?;
    if !EventService::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::not_found("Event not found"));
    }
    Ok(ApiResponse::message("Event deleted"))
}
