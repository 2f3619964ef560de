use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::Extension;
use serde_json::Value;

use crate::error::ApiError;
use crate::media::{MediaId, MediaKind, StoredMedia};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserService;
use crate::state::AppState;

/// POST /api/uploads/:kind
///
/// Expects one multipart field named after the kind (`avatar`, `image`, `document`).
pub async fn upload(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(kind): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<StoredMedia> {
    let kind = MediaKind::parse(&kind)?;
    let mut multipart = multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(kind.as_str()) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
        file = Some((content_type, bytes));
        break;
    }
    let (content_type, bytes) =
        file.ok_or_else(|| ApiError::bad_request(format!("No file uploaded in field '{}'", kind.as_str())))?;

    let stored = state.media.store(kind, caller.id(), &content_type, &bytes).await?;

    if kind == MediaKind::Avatar {
        UserService::new(state.pool.clone())
            .set_avatar(caller.id(), &stored.url, &stored.public_id)
            .await?;
        if let Some(previous) = caller.0.avatar_public_id.as_deref() {
            if let Err(e) = state.media.delete(previous).await {
                tracing::warn!(public_id = previous, error = %e, "Failed to remove previous avatar");
            }
        }
    }

    Ok(ApiResponse::created(stored))
}

/// DELETE /api/uploads/:public_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(public_id): Path<String>,
) -> ApiResult<Value> {
    let media = MediaId::parse(&public_id)?;
    if !caller.can_modify(media.owner) {
        return Err(ApiError::forbidden("Not authorized to delete this file"));
    }
    state.media.delete(&public_id).await?;
    Ok(ApiResponse::message("File deleted"))
}
