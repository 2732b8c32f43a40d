//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use futures::StreamExt;
use media::{IngestError, NewVideo, VideoRecord, load_owned};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::{CreateVideoRequest, PlaybackResponse},
    thumbnails::{MAX_THUMBNAIL_UPLOAD_BYTES, upload_thumbnail},
};

/// Multipart field carrying the video file
const VIDEO_FIELD: &str = "video";

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.assets_root);
    let video_limit = state.pipeline.config().body_limit();

    let protected_routes = Router::new()
        .route("/api/videos", post(create_video))
        .route("/api/videos/:id", get(get_video))
        .route("/api/videos/:id/playback", get(get_playback_url))
        .route(
            "/api/video_upload/:id",
            post(upload_video).layer(DefaultBodyLimit::max(video_limit)),
        )
        .route(
            "/videos/:id/upload",
            post(upload_video).layer(DefaultBodyLimit::max(video_limit)),
        )
        .route(
            "/api/thumbnail_upload/:id",
            post(upload_thumbnail).layer(DefaultBodyLimit::max(MAX_THUMBNAIL_UPLOAD_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .nest_service("/assets", assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Create a draft video record owned by the caller
pub async fn create_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateVideoRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let video = state
        .videos
        .create_video(NewVideo {
            user_id: user.id,
            title: payload.title,
            description: payload.description,
        })
        .await
        .map_err(|e| ApiError::internal("failed to create video", e))?;

    info!(video_id = %video.id, user_id = %user.id, "Video created");
    Ok((StatusCode::CREATED, Json(video)))
}

/// Get a video record owned by the caller
pub async fn get_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<VideoRecord>> {
    let Path(id) = id?;
    let video = load_owned(state.videos.as_ref(), user.id, id).await?;
    Ok(Json(video))
}

/// Upload the video file for a record and publish it
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<VideoRecord>> {
    let Path(id) = id?;
    // Ownership is settled before any of the body is read.
    load_owned(state.videos.as_ref(), user.id, id).await?;
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_owned);
        let body = field.map(|chunk| chunk.map_err(multipart_error));
        let video = state
            .pipeline
            .ingest(user.id, id, content_type.as_deref(), body)
            .await?;

        return Ok(Json(video));
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{VIDEO_FIELD}'"
    )))
}

/// Presigned URL for streaming the caller's uploaded video
pub async fn get_playback_url(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<PlaybackResponse>> {
    let Path(id) = id?;
    let url = state
        .pipeline
        .playback_url(user.id, id, state.presign_ttl)
        .await?;

    Ok(Json(PlaybackResponse {
        url,
        expires_in: state.presign_ttl.as_secs(),
    }))
}

/// Body limit overruns surface as 413; every other multipart failure is
/// the client's
pub(crate) fn multipart_error(err: MultipartError) -> IngestError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestError::PayloadTooLarge
    } else {
        IngestError::BadRequest(err.body_text())
    }
}
