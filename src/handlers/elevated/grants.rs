use axum::extract::{Path, State};
use axum::Extension;
use serde_json::Value;

use crate::database::models::grant::{CreateGrant, UpdateGrant};
use crate::database::models::Grant;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson};
use crate::services::GrantService;
use crate::state::AppState;

/// POST /api/grants
pub async fn create(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateGrant>,
) -> ApiResult<Grant> {
    let grant = GrantService::new(state.pool.clone()).create(admin.id(), &body).await?;
    Ok(ApiResponse::created(grant))
}

/// PUT /api/grants/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateGrant>,
) -> ApiResult<Grant> {
    let id = parse_id(&id, "Grant")?;
    let service = GrantService::new(state.pool.clone());
    if service.find(id).await?.is_none() {
        return Err(ApiError::not_found("Grant not found"));
    }
    Ok(ApiResponse::success(service.update(id, &body).await?))
}

/// DELETE /api/grants/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "Grant")?;
    if !GrantService::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::not_found("Grant not found"));
    }
    Ok(ApiResponse::message("Grant deleted"))
}
