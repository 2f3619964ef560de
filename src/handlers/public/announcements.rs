use axum::extract::{Path, State};
use axum::Extension;
use chrono::Utc;

use crate::database::models::announcement::AnnouncementListParams;
use crate::database::models::Announcement;
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedQuery};
use crate::services::AnnouncementService;
use crate::state::AppState;

const PAGE_SIZE: i64 = 10;

/// GET /api/announcements
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<AnnouncementListParams>,
) -> ApiResult<ListResponse<Announcement>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (announcements, total) = AnnouncementService::new(state.pool.clone())
        .list_visible(&params, Utc::now(), &page)
        .await?;
    Ok(ApiResponse::success(ListResponse::new("announcements", announcements, &page, total)))
}

/// GET /api/announcements/:id
pub async fn get(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> ApiResult<Announcement> {
    let id = parse_id(&id, "Announcement")?;
    let now = Utc::now();
    let announcement = AnnouncementService::new(state.pool.clone())
        .find(id)
        .await?
        .filter(|a| a.is_visible_at(now) || caller.as_ref().is_some_and(|u| u.is_admin()))
        .ok_or_else(|| ApiError::not_found("Announcement not found"))?;
    Ok(ApiResponse::success(announcement))
}
