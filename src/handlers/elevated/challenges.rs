use axum::extract::{Path, State};
use axum::Extension;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::database::models::challenge::{CreateChallenge, Participant, SetWinners, UpdateChallenge};
use crate::database::models::Challenge;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson};
use crate::services::ChallengeService;
use crate::state::AppState;

pub(crate) fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ApiError> {
    if end <= start {
        return Err(ApiError::bad_request("End date must be after start date"));
    }
    Ok(())
}

/// POST /api/challenges
pub async fn create(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateChallenge>,
) -> ApiResult<Challenge> {
    check_window(body.start_date, body.end_date)?;
    let challenge = ChallengeService::new(state.pool.clone()).create(admin.id(), &body).await?;
    Ok(ApiResponse::created(challenge))
}

/// PUT /api/challenges/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateChallenge>,
) -> ApiResult<Challenge> {
    let id = parse_id(&id, "Challenge")?;
    let service = ChallengeService::new(state.pool.clone());
    let current = service
        .find(id, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found("Challenge not found"))?
        .challenge;
    check_window(
        body.start_date.unwrap_or(current.start_date),
        body.end_date.unwrap_or(current.end_date),
    )?;

    let challenge = service.update(id, &body).await?;
    Ok(ApiResponse::success(challenge))
}

/// DELETE /api/challenges/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "Challenge")?;
    if !ChallengeService::new(state.pool.clone()).delete(id).await? {
        return Err(ApiError::not_found("Challenge not found"));
    }
    Ok(ApiResponse::message("Challenge deleted"))
}

/// GET /api/challenges/:id/participants
pub async fn participants(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Participant>> {
    let id = parse_id(&id, "Challenge")?;
    let service = ChallengeService::new(state.pool.clone());
    if service.find(id, Utc::now()).await?.is_none() {
        return Err(ApiError::not_found("Challenge not found"));
    }
    Ok(ApiResponse::success(service.participants(id).await?))
}

/// PUT /api/challenges/:id/winners
pub async fn set_winners(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<SetWinners>,
) -> ApiResult<Challenge> {
    let id = parse_id(&id, "Challenge")?;
    body.check_positions().map_err(ApiError::bad_request)?;

    let service = ChallengeService::new(state.pool.clone());
    if service.find(id, Utc::now()).await?.is_none() {
        return Err(ApiError::not_found("Challenge not found"));
    }
    let strangers = service.unregistered_winners(id, &body.winners).await?;
    if !strangers.is_empty() {
        return Err(ApiError::bad_request("Winners must be registered participants"));
    }

    let challenge = service.set_winners(id, &body.winners).await?;
    Ok(ApiResponse::success(challenge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn end_must_follow_start() {
        let start = Utc::now();
        assert!(check_window(start, start + Duration::hours(1)).is_ok());
        let err = check_window(start, start).unwrap_err();
        assert_eq!(err.message(), "End date must be after start date");
        assert!(check_window(start, start - Duration::days(1)).is_err());
    }
}
