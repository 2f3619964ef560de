use axum::extract::{Path, State};
use axum::Extension;
use chrono::Utc;

use crate::database::models::challenge::ChallengeListParams;
use crate::database::models::ChallengeSummary;
use crate::database::{ListResponse, PageParams, Pagination};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedQuery};
use crate::services::ChallengeService;
use crate::state::AppState;

const PAGE_SIZE: i64 = 10;

/// GET /api/challenges
pub async fn list(
    State(state): State<AppState>,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(params): ValidatedQuery<ChallengeListParams>,
) -> ApiResult<ListResponse<ChallengeSummary>> {
    let page = Pagination::from_params(page, PAGE_SIZE);
    let (challenges, total) = ChallengeService::new(state.pool.clone())
        .list(&params, Utc::now(), &page)
        .await?;
    Ok(ApiResponse::success(ListResponse::new("challenges", challenges, &page, total)))
}

/// GET /api/challenges/:id
pub async fn get(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> ApiResult<ChallengeSummary> {
    let id = parse_id(&id, "Challenge")?;
    let challenge = ChallengeService::new(state.pool.clone())
        .find(id, Utc::now())
        .await?
        .filter(|c| c.challenge.is_public || caller.as_ref().is_some_and(|u| u.is_admin()))
        .ok_or_else(|| ApiError::not_found("Challenge not found"))?;
    Ok(ApiResponse::success(challenge))
}
