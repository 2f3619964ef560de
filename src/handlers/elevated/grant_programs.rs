use axum::extract::{Path, State};
use axum::Extension;
use serde_json::Value;

use crate::database::models::grant_application::ApplicationListParams;
use crate::database::models::grant_program::{CreateGrantProgram, UpdateGrantProgram};
use crate::database::models::{GrantApplicationDetail, GrantProgram};
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson, ValidatedQuery};
use crate::services::{GrantApplicationService, GrantProgramService};
use crate::state::AppState;

const APPLICATIONS_PAGE_SIZE: i64 = 20;

async fn existing(service: &GrantProgramService, id: uuid::Uuid) -> Result<GrantProgram, ApiError> {
    service
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Grant program not found"))
}

/// POST /api/grant-programs
pub async fn create(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateGrantProgram>,
) -> ApiResult<GrantProgram> {
    let program = GrantProgramService::new(state.pool.clone()).create(admin.id(), &body).await?;
    Ok(ApiResponse::created(program))
}

/// PUT /api/grant-programs/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateGrantProgram>,
) -> ApiResult<GrantProgram> {
    let id = parse_id(&id, "Grant program")?;
    let service = GrantProgramService::new(state.pool.clone());
    existing(&service, id).await?;
    Ok(ApiResponse::success(service.update(id, admin.id(), &body).await?))
}

/// DELETE /api/grant-programs/:id
///
/// Programs that have received applications are kept for the record.
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "Grant program")?;
    let service = GrantProgramService::new(state.pool.clone());
    let program = existing(&service, id).await?;
    if program.applications_count > 0 {
        return Err(ApiError::bad_request(
            "Cannot delete a grant program that has received applications",
        ));
    }
    service.delete(id).await?;
    Ok(ApiResponse::message("Grant program deleted"))
}

/// PATCH /api/grant-programs/:id/featured
pub async fn toggle_featured(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<GrantProgram> {
    let id = parse_id(&id, "Grant program")?;
    let program = GrantProgramService::new(state.pool.clone())
        .toggle_featured(id, admin.id())
        .await?
        .ok_or_else(|| ApiError::not_found("Grant program not found"))?;
    Ok(ApiResponse::success(program))
}

/// GET /api/grant-programs/:id/applications
pub async fn applications(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<ApplicationListParams>,
) -> ApiResult<ListResponse<GrantApplicationDetail>> {
    let id = parse_id(&id, "Grant program")?;
    existing(&GrantProgramService::new(state.pool.clone()), id).await?;

    let page = Pagination::from_params(page, APPLICATIONS_PAGE_SIZE);
    let params = ApplicationListParams {
        program_id: Some(id),
        ..params
    };
    let (applications, total) = GrantApplicationService::new(state.pool.clone())
        .list(&params, &page)
        .await?;
    Ok(ApiResponse::success(ListResponse::new("applications", applications, &page, total)))
}
