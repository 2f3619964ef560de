use axum::extract::{Path, State};
use axum::Extension;

use crate::database::models::progress_log::ProgressLogListParams;
use crate::database::models::ProgressLog;
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedQuery};
use crate::services::{ProgressLogService, ProjectService};
use crate::state::AppState;

const PAGE_SIZE: i64 = 20;

/// GET /api/progress-logs
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<ProgressLogListParams>,
) -> ApiResult<ListResponse<ProgressLog>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (logs, total) = ProgressLogService::new(state.pool.clone()).list(&params, &page).await?;
    Ok(ApiResponse::success(ListResponse::new("logs", logs, &page, total)))
}

/// GET /api/progress-logs/project/:project_id
pub async fn list_for_project(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    Path(project_id): Path<String>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
) -> ApiResult<ListResponse<ProgressLog>> {
    let project_id = parse_id(&project_id, "Project")?;
    let viewer = caller.as_ref().map(|c| c.id());
    let is_admin = caller.as_ref().is_some_and(|c| c.is_admin());

    let project = ProjectService::new(state.pool.clone())
        .find(project_id)
        .await?
        .filter(|p| p.visible_to(viewer, is_admin))
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let include_private = is_admin || viewer == Some(project.builder_id);
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (logs, total) = ProgressLogService::new(state.pool.clone())
        .list_for_project(project.id, include_private, &page)
        .await?;
    Ok(ApiResponse::success(ListResponse::new("logs", logs, &page, total)))
}

/// GET /api/progress-logs/:id
pub async fn get(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> ApiResult<ProgressLog> {
    let id = parse_id(&id, "Progress log")?;
    let service = ProgressLogService::new(state.pool.clone());
    // Owners and admins see everything; others only public logs of public projects.
    let log = match service.find(id).await? {
        Some(log) if caller.as_ref().is_some_and(|c| c.can_modify(log.builder_id)) => Some(log),
        Some(_) => service.find_public(id).await?,
        None => None,
    }
    .ok_or_else(|| ApiError::not_found("Progress log not found"))?;
    Ok(ApiResponse::success(log))
}
