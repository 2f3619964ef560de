use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::validate_jwt;
use crate::database::models::User;
use crate::error::ApiError;
use crate::services::UserService;
use crate::state::AppState;

/// The caller, loaded fresh from the database on every authenticated request.
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin
    }

    /// Owner or administrator.
    pub fn can_modify(&self, owner_id: Uuid) -> bool {
        self.0.id == owner_id || self.0.is_admin
    }
}

/// Validates the bearer token and attaches the user, or fails 401.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;
    let user = load_user(&state, &token).await?;

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

/// Like `jwt_auth_middleware` but lets anonymous callers through. A bad token
/// is treated as no token.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Ok(token) = extract_jwt_from_headers(&headers) {
        match load_user(&state, &token).await {
            Ok(user) => {
                request.extensions_mut().insert(AuthUser(user));
            }
            Err(ApiError::Unauthorized(_)) => {}
            Err(other) => return Err(other),
        }
    }
    Ok(next.run(request).await)
}

/// Must run after `jwt_auth_middleware`.
pub async fn admin_auth_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))?;

    if !user.is_admin() {
        tracing::warn!(user_id = %user.id(), path = %request.uri().path(), "Admin route refused");
        return Err(ApiError::forbidden("Access denied. Admin only."));
    }

    Ok(next.run(request).await)
}

async fn load_user(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = validate_jwt(token)?;
    UserService::new(state.pool.clone())
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Token is not valid"))
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "No token, authorization denied".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("No token, authorization denied".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
