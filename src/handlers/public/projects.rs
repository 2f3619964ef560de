use axum::extract::{Path, State};
use axum::Extension;

use crate::database::models::project::ProjectListParams;
use crate::database::models::Project;
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedQuery};
use crate::services::ProjectService;
use crate::state::AppState;

pub(crate) const PAGE_SIZE: i64 = 12;

/// GET /api/projects
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<ProjectListParams>,
) -> ApiResult<ListResponse<Project>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (projects, total) = ProjectService::new(state.pool.clone()).list(&params, &page).await?;
    Ok(ApiResponse::success(ListResponse::new("projects", projects, &page, total)))
}

/// GET /api/projects/:id
///
/// Private projects look missing to everyone but their builder and administrators.
pub async fn get(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let id = parse_id(&id, "Project")?;
    let project = ProjectService::new(state.pool.clone())
        .find(id)
        .await?
        .filter(|p| p.visible_to(caller.as_ref().map(|c| c.id()), caller.as_ref().is_some_and(|c| c.is_admin())))
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    Ok(ApiResponse::success(project))
}
