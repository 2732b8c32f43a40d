//! Metadata store seam

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::error::{IngestError, RecordStoreError};
use crate::models::{NewVideo, VideoRecord};

/// Key-value-by-ID store for video records. No transactions: a concurrent
/// writer racing the same record wins if it writes last.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>, RecordStoreError>;

    async fn update_video(&self, video: &VideoRecord) -> Result<(), RecordStoreError>;

    async fn create_video(&self, video: NewVideo) -> Result<VideoRecord, RecordStoreError>;
}

/// Load a record and check that `caller` owns it
pub async fn load_owned(
    videos: &dyn VideoStore,
    caller: Uuid,
    video_id: Uuid,
) -> Result<VideoRecord, IngestError> {
    let video = videos
        .get_video(video_id)
        .await
        .map_err(|e| IngestError::internal("failed to load video", e))?
        .ok_or_else(|| IngestError::NotFound("Couldn't find video".to_string()))?;

    if video.user_id != caller {
        warn!(video_id = %video_id, caller = %caller, "Caller does not own video");
        return Err(IngestError::Unauthorized(
            "Video does not belong to user".to_string(),
        ));
    }

    Ok(video)
}
