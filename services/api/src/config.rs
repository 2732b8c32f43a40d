//! Service configuration loaded from the process environment

use ::config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use common::database::DatabaseConfig;
use media::{MAX_VIDEO_UPLOAD_BYTES, PipelineConfig};

/// Everything the API service reads from its environment, once, at startup
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub port: u16,
    pub assets_root: PathBuf,
    pub s3_bucket: String,
    pub s3_region: String,
    /// S3-compatible endpoint; unset means AWS
    pub s3_endpoint: Option<String>,
    /// Public root that stored video keys are served under
    pub s3_cf_distro: String,
    pub scratch_dir: Option<PathBuf>,
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub tool_timeout_secs: u64,
    pub presign_ttl_secs: u64,
    /// Largest accepted video, in bytes
    pub max_upload_bytes: u64,
}

impl AppConfig {
    /// Load from environment variables such as `DATABASE_URL` and `S3_BUCKET`
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("database_max_connections", 5)?
            .set_default("port", 8091)?
            .set_default("assets_root", "./assets")?
            .set_default("s3_region", "us-east-1")?
            .set_default("ffprobe_path", "ffprobe")?
            .set_default("ffmpeg_path", "ffmpeg")?
            .set_default("tool_timeout_secs", 600)?
            .set_default("presign_ttl_secs", 900)?
            .set_default("max_upload_bytes", MAX_VIDEO_UPLOAD_BYTES as i64)?
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url).with_max_connections(self.database_max_connections)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        let mut pipeline = PipelineConfig::new(&self.s3_bucket, &self.s3_cf_distro)
            .with_max_upload_bytes(self.max_upload_bytes);
        if let Some(dir) = &self.scratch_dir {
            pipeline = pipeline.with_scratch_dir(dir);
        }
        pipeline.ffprobe_path = self.ffprobe_path.clone();
        pipeline.ffmpeg_path = self.ffmpeg_path.clone();
        pipeline.tool_timeout = Duration::from_secs(self.tool_timeout_secs);
        pipeline
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_secs)
    }
}
