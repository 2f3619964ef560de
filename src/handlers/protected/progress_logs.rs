use axum::extract::{Path, State};
use axum::Extension;
use serde_json::Value;

use crate::database::models::progress_log::{CreateProgressLog, UpdateProgressLog};
use crate::database::models::ProgressLog;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson};
use crate::services::{ProgressLogService, ProjectService};
use crate::state::AppState;

async fn owned_log(service: &ProgressLogService, caller: &AuthUser, raw_id: &str) -> Result<ProgressLog, ApiError> {
    let id = parse_id(raw_id, "Progress log")?;
    let log = service
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Progress log not found"))?;
    if !caller.can_modify(log.builder_id) {
        return Err(ApiError::forbidden("Not authorized to modify this progress log"));
    }
    Ok(log)
}

/// POST /api/progress-logs
///
/// Logs can only be added to the caller's own projects.
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateProgressLog>,
) -> ApiResult<ProgressLog> {
    let project = ProjectService::new(state.pool.clone())
        .find(body.project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    if project.builder_id != caller.id() {
        return Err(ApiError::forbidden("You can only log progress on your own projects"));
    }

    let log = ProgressLogService::new(state.pool.clone()).create(caller.id(), &body).await?;
    Ok(ApiResponse::created(log))
}

/// PUT /api/progress-logs/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateProgressLog>,
) -> ApiResult<ProgressLog> {
    let service = ProgressLogService::new(state.pool.clone());
    let log = owned_log(&service, &caller, &id).await?;
    let log = service.update(log.id, &body).await?;
    Ok(ApiResponse::success(log))
}

/// DELETE /api/progress-logs/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let service = ProgressLogService::new(state.pool.clone());
    let log = owned_log(&service, &caller, &id).await?;
    service.delete(log.id).await?;
    Ok(ApiResponse::message("Progress log deleted"))
}
