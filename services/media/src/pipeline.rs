//! Video ingestion: validate, stage, probe, remux, upload, record.
//!
//! Steps run strictly in order for a request and a failure at any step is
//! terminal; nothing is retried. Both staged files are discarded on every
//! exit path.
//!
//! If the record update fails after a successful upload, the uploaded object
//! stays in the bucket with no record pointing to it. That gap is accepted:
//! there is no compensating delete.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{ACCEPTED_VIDEO_TYPE, PipelineConfig};
use crate::error::{IngestError, IngestResult};
use crate::faststart::FastStartRewriter;
use crate::models::{AspectClass, MediaType, ObjectKey, VideoRecord, key_from_public_url};
use crate::object_store::ObjectStore;
use crate::probe::MediaProbe;
use crate::staging::{StagedFile, StagingArea};
use crate::store::{VideoStore, load_owned};

pub struct IngestionPipeline {
    config: PipelineConfig,
    videos: Arc<dyn VideoStore>,
    probe: Arc<dyn MediaProbe>,
    rewriter: Arc<dyn FastStartRewriter>,
    store: Arc<dyn ObjectStore>,
    staging: StagingArea,
}

impl IngestionPipeline {
    pub fn new(
        config: &PipelineConfig,
        videos: Arc<dyn VideoStore>,
        probe: Arc<dyn MediaProbe>,
        rewriter: Arc<dyn FastStartRewriter>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            staging: StagingArea::new(config.scratch_dir.clone()),
            config: config.clone(),
            videos,
            probe,
            rewriter,
            store,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for one upload.
    ///
    /// `content_type` is the declared type of the uploaded part and `body`
    /// its bytes. Body errors are passed through unchanged, so a transport
    /// size limit surfaces as [`IngestError::PayloadTooLarge`].
    pub async fn ingest<S>(
        &self,
        caller: Uuid,
        video_id: Uuid,
        content_type: Option<&str>,
        body: S,
    ) -> IngestResult<VideoRecord>
    where
        S: Stream<Item = Result<Bytes, IngestError>> + Send,
    {
        let mut video = load_owned(self.videos.as_ref(), caller, video_id).await?;
        let media_type = accept_media_type(content_type)?;

        info!(video_id = %video_id, user_id = %caller, "Uploading video");

        let mut original = self.staging.create(media_type.subtype()).await?;
        let outcome = self
            .process(&mut video, &mut original, &media_type, body)
            .await;
        self.staging.discard(original).await;

        match outcome {
            Ok(()) => Ok(video),
            Err(e) => {
                error!(video_id = %video_id, error = %e, "Video ingestion failed");
                Err(e)
            }
        }
    }

    async fn process<S>(
        &self,
        video: &mut VideoRecord,
        original: &mut StagedFile,
        media_type: &MediaType,
        body: S,
    ) -> IngestResult<()>
    where
        S: Stream<Item = Result<Bytes, IngestError>> + Send,
    {
        let mut body = std::pin::pin!(body);
        let mut received = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            if received > self.config.max_upload_bytes {
                return Err(IngestError::PayloadTooLarge);
            }
            original.write(&chunk).await?;
        }
        if received == 0 {
            return Err(IngestError::BadRequest("Uploaded video is empty".to_string()));
        }
        original.rewind().await?;

        let geometry = self
            .probe
            .probe(original.path())
            .await
            .map_err(|e| IngestError::internal("failed to inspect video", e))?;
        let orientation = geometry.aspect_class();
        info!(
            width = geometry.width,
            height = geometry.height,
            orientation = %orientation,
            "Classified video"
        );

        let rewritten = self
            .staging
            .adopt(self.rewriter.output_path(original.path()));
        let outcome = self
            .publish(video, original.path(), orientation, media_type)
            .await;
        self.staging.discard(rewritten).await;
        outcome
    }

    async fn publish(
        &self,
        video: &mut VideoRecord,
        original: &Path,
        orientation: AspectClass,
        media_type: &MediaType,
    ) -> IngestResult<()> {
        let rewritten = self
            .rewriter
            .rewrite(original)
            .await
            .map_err(|e| IngestError::internal("failed to prepare video for streaming", e))?;
        // The caller only guards the advertised output path.
        let _unexpected_output = (rewritten != self.rewriter.output_path(original))
            .then(|| self.staging.adopt(rewritten.clone()));

        let object_key = ObjectKey::generate(orientation, media_type.subtype());
        let key = object_key.to_string();
        self.store
            .put(&self.config.bucket, &key, &rewritten, media_type.essence())
            .await
            .map_err(IngestError::from_store)?;

        let mut updated = video.clone();
        updated.video_url = Some(object_key.public_url(&self.config.distribution_root));
        if let Err(e) = self.videos.update_video(&updated).await {
            warn!(key = %key, "Uploaded object has no record pointing to it");
            return Err(IngestError::internal("failed to update video url", e));
        }

        info!(key = %key, "Video published");
        *video = updated;
        Ok(())
    }

    /// Time-limited read URL for the object behind the record's video URL
    pub async fn playback_url(
        &self,
        caller: Uuid,
        video_id: Uuid,
        ttl: Duration,
    ) -> IngestResult<String> {
        let video = load_owned(self.videos.as_ref(), caller, video_id).await?;
        let url = video
            .video_url
            .ok_or_else(|| IngestError::NotFound("Video has not been uploaded yet".to_string()))?;
        let key = key_from_public_url(&self.config.distribution_root, &url).ok_or_else(|| {
            IngestError::internal(
                "stored video url is outside the distribution root",
                url.clone(),
            )
        })?;

        self.store
            .presign(&self.config.bucket, key, ttl)
            .await
            .map_err(IngestError::from_store)
    }
}

/// Gate on the declared media type before anything is staged
fn accept_media_type(content_type: Option<&str>) -> IngestResult<MediaType> {
    let header = content_type
        .ok_or_else(|| IngestError::BadRequest("Header must include Content-Type".to_string()))?;
    let media_type = MediaType::parse(header)
        .ok_or_else(|| IngestError::BadRequest(format!("Invalid Content-Type: {header}")))?;

    if media_type.essence() != ACCEPTED_VIDEO_TYPE {
        return Err(IngestError::UnsupportedMediaType(format!(
            "Video upload must be {ACCEPTED_VIDEO_TYPE}, got {media_type}"
        )));
    }

    Ok(media_type)
}
