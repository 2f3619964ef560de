use axum::extract::{Path, State};
use axum::Extension;

use crate::database::models::grant_program::GrantProgramListParams;
use crate::database::models::{GrantProgram, ProgramStatus};
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedQuery};
use crate::services::GrantProgramService;
use crate::state::AppState;

const PAGE_SIZE: i64 = 10;

/// GET /api/grant-programs
///
/// Drafts are listed for administrators only.
pub async fn list(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<GrantProgramListParams>,
) -> ApiResult<ListResponse<GrantProgram>> {
    let include_drafts = caller.as_ref().is_some_and(|u| u.is_admin());
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (programs, total) = GrantProgramService::new(state.pool.clone())
        .list(&params, include_drafts, &page)
        .await?;
    Ok(ApiResponse::success(ListResponse::new("programs", programs, &page, total)))
}

/// GET /api/grant-programs/:id
pub async fn get(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> ApiResult<GrantProgram> {
    let id = parse_id(&id, "Grant program")?;
    let program = GrantProgramService::new(state.pool.clone())
        .find(id)
        .await?
        .filter(|p| p.status != ProgramStatus::Draft || caller.as_ref().is_some_and(|u| u.is_admin()))
        .ok_or_else(|| ApiError::not_found("Grant program not found"))?;
    Ok(ApiResponse::success(program))
}
