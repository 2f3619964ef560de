use axum::extract::{Path, State};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::auth::password::check_password_strength;
use crate::auth::{generate_jwt, generate_reset_token, hash_password, hash_reset_token, verify_password, Claims};
use crate::config::config;
use crate::database::models::user::{ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::notifications::Notification;
use crate::services::UserService;
use crate::state::AppState;

const FORGOT_PASSWORD_REPLY: &str = "If an account exists for that email, a reset link has been sent";

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

impl AuthResponse {
    pub fn for_user(user: User) -> Result<Self, ApiError> {
        let token = generate_jwt(&Claims::new(user.id, &user.email))?;
        Ok(Self { token, user })
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let security = &config().security;
    check_password_strength(&body.password, security.password_min_length)
        .map_err(|message| ApiError::validation_error(vec![message]))?;

    let users = UserService::new(state.pool.clone());
    if users.find_by_email(&body.email).await?.is_some() {
        return Err(ApiError::conflict("User already exists with this email"));
    }

    let password_hash = hash_password(&body.password)?;
    // A concurrent registration surfaces as uq_users_email and maps to the same message.
    let user = users.create(&body.name, &body.email, &password_hash, false).await?;

    state.notifications.enqueue(Notification::Welcome {
        to: user.email.clone(),
        name: user.name.clone(),
    });

    Ok(ApiResponse::created(AuthResponse::for_user(user)?))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let user = UserService::new(state.pool.clone())
        .find_by_email(&body.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&body.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Failed login");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(ApiResponse::success(AuthResponse::for_user(user)?))
}

/// POST /api/auth/forgot-password
///
/// Always answers the same way so the endpoint doesn't reveal which emails have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult<Value> {
    let users = UserService::new(state.pool.clone());
    if let Some(user) = users.find_by_email(&body.email).await? {
        let security = &config().security;
        let (token, token_hash) = generate_reset_token();
        let expires = Utc::now() + Duration::minutes(security.reset_token_expiry_minutes);
        users.store_reset_token(user.id, &token_hash, expires).await?;

        state.notifications.enqueue(Notification::PasswordReset {
            to: user.email.clone(),
            name: user.name.clone(),
            reset_url: format!("{}/reset-password/{}", security.frontend_url.trim_end_matches('/'), token),
            expires_in_minutes: security.reset_token_expiry_minutes,
        });
        tracing::info!(user_id = %user.id, "Password reset requested");
    }

    Ok(ApiResponse::message(FORGOT_PASSWORD_REPLY))
}

/// POST /api/auth/reset-password/:token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidatedJson(body): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<Value> {
    check_password_strength(&body.password, config().security.password_min_length)
        .map_err(|message| ApiError::validation_error(vec![message]))?;

    let users = UserService::new(state.pool.clone());
    let user = users
        .find_by_reset_token(&hash_reset_token(&token), Utc::now())
        .await?
        .ok_or_else(|| ApiError::bad_request("Password reset token is invalid or has expired"))?;

    users.set_password(user.id, &hash_password(&body.password)?).await?;

    tracing::info!(user_id = %user.id, "Password reset completed");
    Ok(ApiResponse::message("Password has been reset"))
}
