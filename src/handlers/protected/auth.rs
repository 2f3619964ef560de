use axum::extract::State;
use axum::Extension;
use serde_json::Value;

use crate::auth::password::check_password_strength;
use crate::auth::{hash_password, verify_password};
use crate::config::config;
use crate::database::models::user::{ChangePasswordRequest, UpdateProfile};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson};
use crate::services::UserService;
use crate::state::AppState;

/// GET /api/auth/me
pub async fn me(Extension(caller): Extension<AuthUser>) -> ApiResult<User> {
    Ok(ApiResponse::success(caller.0))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<UpdateProfile>,
) -> ApiResult<User> {
    let user = UserService::new(state.pool.clone())
        .update_profile(caller.id(), &body)
        .await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/auth/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Value> {
    if !verify_password(&body.current_password, &caller.0.password_hash)? {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }
    check_password_strength(&body.new_password, config().security.password_min_length)
        .map_err(|message| ApiError::validation_error(vec![message]))?;

    UserService::new(state.pool.clone())
        .set_password(caller.id(), &hash_password(&body.new_password)?)
        .await?;

    tracing::info!(user_id = %caller.id(), "Password changed");
    Ok(ApiResponse::message("Password updated"))
}
