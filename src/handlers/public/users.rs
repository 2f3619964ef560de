use axum::extract::{Path, State};
use serde::Serialize;

use crate::database::models::user::UserListParams;
use crate::database::models::{Project, User};
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, ValidatedQuery};
use crate::services::{ProjectService, UserService};
use crate::state::AppState;

const PAGE_SIZE: i64 = 12;

#[derive(Debug, Serialize)]
pub struct Portfolio {
    pub user: User,
    pub projects: Vec<Project>,
}

/// GET /api/users
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<UserListParams>,
) -> ApiResult<ListResponse<User>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (users, total) = UserService::new(state.pool.clone()).list(&params, &page).await?;
    Ok(ApiResponse::success(ListResponse::new("users", users, &page, total)))
}

/// GET /api/users/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Portfolio> {
    let id = parse_id(&id, "User")?;
    let user = UserService::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let projects = ProjectService::new(state.pool.clone()).public_by_builder(id).await?;
    Ok(ApiResponse::success(Portfolio { user, projects }))
}
