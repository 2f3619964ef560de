use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde_json::Value;

use crate::database::models::grant_application::ApplicationListParams;
use crate::database::models::{GrantApplication, GrantApplicationDetail};
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedQuery};
use crate::notifications::Notification;
use crate::services::GrantApplicationService;
use crate::state::AppState;

const PAGE_SIZE: i64 = 10;

/// POST /api/grant-applications
///
/// The raw body goes to the field validator so every violation is reported at once.
pub async fn submit(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<GrantApplication> {
    let Json(payload) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let (application, program, project) = GrantApplicationService::new(state.pool.clone())
        .submit(caller.id(), &payload, Utc::now())
        .await?;

    state.notifications.enqueue(Notification::ApplicationSubmitted {
        to: caller.0.email.clone(),
        name: caller.0.name.clone(),
        program_title: program.title,
        project_title: project.title,
    });

    Ok(ApiResponse::created(application))
}

/// GET /api/grant-applications/my-applications
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<ApplicationListParams>,
) -> ApiResult<ListResponse<GrantApplicationDetail>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (applications, total) = GrantApplicationService::new(state.pool.clone())
        .list_for_applicant(caller.id(), params.status, &page)
        .await?;
    Ok(ApiResponse::success(ListResponse::new("applications", applications, &page, total)))
}

/// GET /api/grant-applications/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<GrantApplicationDetail> {
    let id = parse_id(&id, "Grant application")?;
    let detail = GrantApplicationService::new(state.pool.clone())
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Grant application not found"))?;
    if !caller.can_modify(detail.application.applicant_id) {
        return Err(ApiError::forbidden("Not authorized to view this application"));
    }
    Ok(ApiResponse::success(detail))
}

/// DELETE /api/grant-applications/:id
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Grant application")?;
    GrantApplicationService::new(state.pool.clone())
        .withdraw(id, caller.id(), caller.is_admin())
        .await?;
    Ok(ApiResponse::message("Application withdrawn"))
}
