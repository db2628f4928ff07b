use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::app::uploads::{UploadService, MAX_THUMBNAIL_BYTES, MAX_VIDEO_BYTES};
use crate::domain::video::Video;
use crate::http::{AppError, AuthUser};
use crate::AppState;

const THUMBNAIL_MEDIA_TYPES: [&str; 2] = ["image/jpeg", "image/png"];
const VIDEO_MEDIA_TYPE: &str = "video/mp4";

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.videos.ping().await.is_ok();
    let status = if db { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

pub async fn get_video(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Video>, AppError> {
    let video = state.videos.get(id).await.map_err(|err| {
        tracing::error!(error = ?err, video_id = %id, "failed to load video");
        AppError::internal("failed to load video")
    })?;

    video
        .map(Json)
        .ok_or_else(|| AppError::not_found("video not found"))
}

struct UploadField {
    media_type: String,
    data: Bytes,
}

/// Pull the named file field out of the multipart body. Other fields are
/// skipped; a missing field is `None` so callers can phrase their own 400.
async fn upload_field(
    mut multipart: Multipart,
    name: &str,
) -> Result<Option<UploadField>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("failed to read multipart body: {}", err)))?
    {
        if field.name() == Some(name) {
            let media_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(|err| {
                AppError::bad_request(format!("failed to read uploaded file: {}", err))
            })?;
            return Ok(Some(UploadField { media_type, data }));
        }
    }

    Ok(None)
}

/// Load the target record and check ownership. Runs before any validation
/// or filesystem work on both upload paths.
async fn load_owned_video(
    state: &AppState,
    video_id: Uuid,
    user_id: Uuid,
) -> Result<Video, AppError> {
    let video = state.videos.get(video_id).await.map_err(|err| {
        tracing::error!(error = ?err, video_id = %video_id, "failed to load video");
        AppError::internal("failed to load video")
    })?;

    let video = video.ok_or_else(|| AppError::not_found("video not found"))?;
    if video.user_id != user_id {
        return Err(AppError::forbidden("not the owner of this video"));
    }

    Ok(video)
}

pub async fn upload_thumbnail(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let mut video = load_owned_video(&state, id, auth.user_id).await?;

    let field = upload_field(multipart, "thumbnail")
        .await?
        .ok_or_else(|| AppError::bad_request("thumbnail file missing"))?;

    if field.data.len() > MAX_THUMBNAIL_BYTES {
        return Err(AppError::bad_request(
            "thumbnail exceeds the maximum allowed size of 10MB",
        ));
    }
    if !THUMBNAIL_MEDIA_TYPES.contains(&field.media_type.as_str()) {
        return Err(AppError::bad_request(
            "invalid file type, only JPEG or PNG allowed",
        ));
    }

    let service = UploadService::new(
        state.videos.clone(),
        state.storage.clone(),
        state.media.clone(),
        state.assets.clone(),
    );
    service
        .save_thumbnail(&mut video, &field.media_type, field.data)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, video_id = %id, "failed to store thumbnail");
            AppError::internal("failed to store thumbnail")
        })?;

    Ok(Json(video))
}

pub async fn upload_video(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<StatusCode, AppError> {
    let mut video = load_owned_video(&state, id, auth.user_id).await?;

    let field = upload_field(multipart, "video")
        .await?
        .ok_or_else(|| AppError::bad_request("video file missing"))?;

    if field.data.len() > MAX_VIDEO_BYTES {
        return Err(AppError::bad_request(
            "video exceeds the maximum allowed size of 1GB",
        ));
    }
    if field.media_type != VIDEO_MEDIA_TYPE {
        return Err(AppError::bad_request("invalid file type, only MP4 allowed"));
    }

    let service = UploadService::new(
        state.videos.clone(),
        state.storage.clone(),
        state.media.clone(),
        state.assets.clone(),
    );
    service
        .publish_video(&mut video, &field.media_type, field.data)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, video_id = %id, "failed to publish video");
            AppError::internal("failed to publish video")
        })?;

    Ok(StatusCode::OK)
}
