use axum::extract::{Path, State};
use axum::Extension;
use chrono::Utc;

use crate::database::models::grant::GrantListParams;
use crate::database::models::Grant;
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedQuery};
use crate::services::GrantService;
use crate::state::AppState;

const PAGE_SIZE: i64 = 10;

/// GET /api/grants
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<GrantListParams>,
) -> ApiResult<ListResponse<Grant>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (grants, total) = GrantService::new(state.pool.clone()).list(&params, Utc::now(), &page).await?;
    Ok(ApiResponse::success(ListResponse::new("grants", grants, &page, total)))
}

/// GET /api/grants/:id
pub async fn get(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> ApiResult<Grant> {
    let id = parse_id(&id, "Grant")?;
    let grant = GrantService::new(state.pool.clone())
        .find(id)
        .await?
        .filter(|g| g.is_active || caller.as_ref().is_some_and(|u| u.is_admin()))
        .ok_or_else(|| ApiError::not_found("Grant not found"))?;
    Ok(ApiResponse::success(grant))
}
