//! Pipeline configuration, built once at startup by the hosting service.

use std::path::PathBuf;
use std::time::Duration;

use crate::command::DEFAULT_TOOL_TIMEOUT;

/// Default ceiling on an uploaded video (10 GiB)
pub const MAX_VIDEO_UPLOAD_BYTES: u64 = 10 << 30;

/// Media type accepted by the video pipeline
pub const ACCEPTED_VIDEO_TYPE: &str = "video/mp4";

/// Settings the ingestion pipeline needs. Nothing here is read from the
/// environment by the pipeline itself.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bucket receiving finished videos
    pub bucket: String,
    /// Public root that object keys are appended to
    pub distribution_root: String,
    /// Process-local scratch directory for staged uploads
    pub scratch_dir: PathBuf,
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    /// Ceiling for each external tool invocation
    pub tool_timeout: Duration,
    /// Largest video accepted, in bytes
    pub max_upload_bytes: u64,
}

impl PipelineConfig {
    pub fn new(bucket: impl Into<String>, distribution_root: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            distribution_root: distribution_root.into(),
            scratch_dir: std::env::temp_dir().join("tubely-staging"),
            ffprobe_path: PathBuf::from("ffprobe"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            max_upload_bytes: MAX_VIDEO_UPLOAD_BYTES,
        }
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Upload ceiling as a request body limit. Saturates on targets where
    /// it does not fit in `usize`.
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }
}
