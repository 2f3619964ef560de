use axum::extract::{Path, State};
use axum::Extension;
use chrono::Utc;

use crate::database::models::event::EventListParams;
use crate::database::models::EventSummary;
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedQuery};
use crate::services::EventService;
use crate::state::AppState;

const PAGE_SIZE: i64 = 10;

/// GET /api/events
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<EventListParams>,
) -> ApiResult<ListResponse<EventSummary>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (events, total) = EventService::new(state.pool.clone()).list(&params, Utc::now(), &page).await?;
    Ok(ApiResponse::success(ListResponse::new("events", events, &page, total)))
}

/// GET /api/events/:id
pub async fn get(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> ApiResult<EventSummary> {
    let id = parse_id(&id, "Event")?;
    let event = EventService::new(state.pool.clone())
        .find(id)
        .await?
        .filter(|e| e.event.is_public || caller.as_ref().is_some_and(|u| u.is_admin()))
        .ok_or_else(|| ApiError::not_found("Event not found"))?;
    Ok(ApiResponse::success(event))
}
