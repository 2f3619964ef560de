use axum::extract::{Path, State};
use axum::Extension;
use serde_json::Value;

use crate::database::models::announcement::{CreateAnnouncement, UpdateAnnouncement};
use crate::database::models::Announcement;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson};
use crate::services::AnnouncementService;
use crate::state::AppState;

/// POST /api/announcements
pub async fn create(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateAnnouncement>,
) -> ApiResult<Announcement> {
    let announcement = AnnouncementService::new(state.pool.clone()).create(admin.id(), &body).await?;
    Ok(ApiResponse::created(announcement))
}

/// PUT /api/announcements/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateAnnouncement>,
) -> ApiResult<Announcement> {
    let id = parse_id(&id, "Announcement")?;
    let service = AnnouncementService::new(state.pool.clone());
    if service.find(id).await?.is_none() {
        return Err(ApiError::not_found("Announcement not found"));
    }
    Ok(ApiResponse::success(service.update(id, &body).await?))
}

/// DELETE /api/announcements/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "Announcement")?;
    if !AnnouncementService::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::not_found("Announcement not found"));
    }
    Ok(ApiResponse::message("Announcement deleted"))
}
