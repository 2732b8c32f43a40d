//! Thumbnail upload handler
//!
//! Thumbnails are small, so they skip the ingestion pipeline: the image is
//! read into memory, written under the assets root and served back by the
//! static file route.

use axum::{
    Extension, Json,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
        rejection::PathRejection,
    },
};
use media::{MediaType, VideoRecord, load_owned, random_token};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    routes::multipart_error,
};

/// Largest thumbnail body accepted (10 MiB)
pub const MAX_THUMBNAIL_UPLOAD_BYTES: usize = 10 << 20;

const THUMBNAIL_FIELD: &str = "thumbnail";

/// File extension for an accepted thumbnail type
fn thumbnail_extension(content_type: Option<&str>) -> ApiResult<&'static str> {
    let header = content_type
        .ok_or_else(|| ApiError::BadRequest("Missing Content-Type for thumbnail".to_string()))?;
    let media_type = MediaType::parse(header)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid Content-Type: {header}")))?;

    match media_type.essence() {
        "image/png" => Ok("png"),
        "image/jpeg" => Ok("jpg"),
        other => Err(ApiError::UnsupportedMediaType(format!(
            "Thumbnail must be image/png or image/jpeg, got {other}"
        ))),
    }
}

/// Store a thumbnail image for a video owned by the caller
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<VideoRecord>> {
    let Path(id) = id?;
    let mut video = load_owned(state.videos.as_ref(), user.id, id).await?;
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }

        let extension = thumbnail_extension(field.content_type())?;
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("Thumbnail is empty".to_string()));
        }

        tokio::fs::create_dir_all(&state.assets_root)
            .await
            .map_err(|e| ApiError::internal("failed to create assets directory", e))?;

        let file_name = format!("{}.{extension}", random_token());
        tokio::fs::write(state.assets_root.join(&file_name), &data)
            .await
            .map_err(|e| ApiError::internal("failed to write thumbnail", e))?;

        video.thumbnail_url = Some(format!(
            "http://localhost:{}/assets/{file_name}",
            state.port
        ));
        state
            .videos
            .update_video(&video)
            .await
            .map_err(|e| ApiError::internal("failed to update thumbnail url", e))?;

        info!(video_id = %id, file = %file_name, bytes = data.len(), "Thumbnail stored");
        return Ok(Json(video));
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{THUMBNAIL_FIELD}'"
    )))
}
