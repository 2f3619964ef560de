use axum::extract::{Path, State};
use axum::Extension;
use chrono::Utc;

use crate::database::models::grant_application::{ApplicationListParams, UpdateApplicationStatus};
use crate::database::models::{GrantApplication, GrantApplicationDetail};
use crate::database::{ListResponse, PageParams, Pagination};
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson, ValidatedQuery};
use crate::notifications::Notification;
use crate::services::{GrantApplicationService, UserService};
use crate::state::AppState;

const PAGE_SIZE: i64 = 20;

/// GET /api/grant-applications
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<ApplicationListParams>,
) -> ApiResult<ListResponse<GrantApplicationDetail>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (applications, total) = GrantApplicationService::new(state.pool.clone())
        .list(&params, &page)
        .await?;
    Ok(ApiResponse::success(ListResponse::new("applications", applications, &page, total)))
}

/// PUT /api/grant-applications/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateApplicationStatus>,
) -> ApiResult<GrantApplication> {
    let id = parse_id(&id, "Grant application")?;
    let service = GrantApplicationService::new(state.pool.clone());
    let review = service
        .update_status(id, admin.id(), body.status, body.review_notes.as_deref(), Utc::now())
        .await?;

    let application = review.application;
    if review.changed && application.status.is_terminal() {
        notify_applicant(&state, &service, &application).await;
    }

    Ok(ApiResponse::success(application))
}

/// Best effort: a lookup failure only skips the email.
async fn notify_applicant(state: &AppState, service: &GrantApplicationService, application: &GrantApplication) {
    let applicant = UserService::new(state.pool.clone()).find_by_id(application.applicant_id).await;
    let detail = service.find(application.id).await;
    match (applicant, detail) {
        (Ok(Some(applicant)), Ok(Some(detail))) => {
            state.notifications.enqueue(Notification::ApplicationReviewed {
                to: applicant.email,
                name: applicant.name,
                program_title: detail.program_title,
                status: application.status,
                review_notes: application.review_notes.clone().unwrap_or_default(),
            });
        }
        _ => tracing::warn!(application_id = %application.id, "Skipping review email, applicant lookup failed"),
    }
}
