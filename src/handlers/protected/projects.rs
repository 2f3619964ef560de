use axum::extract::{Path, State};
use axum::Extension;
use serde_json::Value;

use crate::database::models::project::{CreateProject, UpdateProject};
use crate::database::models::Project;
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::handlers::public::projects::PAGE_SIZE;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson, ValidatedQuery};
use crate::services::ProjectService;
use crate::state::AppState;

/// Loads a project the caller may change: its builder or an administrator.
pub(crate) async fn owned_project(service: &ProjectService, caller: &AuthUser, raw_id: &str) -> Result<Project, ApiError> {
    let id = parse_id(raw_id, "Project")?;
    let project = service
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    if !caller.can_modify(project.builder_id) {
        return Err(ApiError::forbidden("Not authorized to modify this project"));
    }
    Ok(project)
}

/// GET /api/projects/my-projects
pub async fn my_projects(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
) -> ApiResult<ListResponse<Project>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (projects, total) = ProjectService::new(state.pool.clone())
        .list_by_builder(caller.id(), &page)
        .await?;
    Ok(ApiResponse::success(ListResponse::new("projects", projects, &page, total)))
}

/// POST /api/projects
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateProject>,
) -> ApiResult<Project> {
    let project = ProjectService::new(state.pool.clone()).create(caller.id(), &body).await?;
    Ok(ApiResponse::created(project))
}

/// PUT /api/projects/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateProject>,
) -> ApiResult<Project> {
    let service = ProjectService::new(state.pool.clone());
    let project = owned_project(&service, &caller, &id).await?;
    let project = service.update(project.id, &body).await?;
    Ok(ApiResponse::success(project))
}

/// DELETE /api/projects/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let service = ProjectService::new(state.pool.clone());
    let project = owned_project(&service, &caller, &id).await?;
    service.delete(project.id).await?;
    Ok(ApiResponse::message("Project deleted"))
}
