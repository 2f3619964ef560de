use axum::extract::{Path, State};

use crate::database::models::Project;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ProjectService;
use crate::state::AppState;

/// PATCH /api/projects/:id/featured
pub async fn toggle_featured(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Project> {
    let id = parse_id(&id, "Project")?;
    let project = ProjectService::new(state.pool.clone())
        .toggle_featured(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    Ok(ApiResponse::success(project))
}
