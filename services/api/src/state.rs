//! Application state shared across handlers

use media::{IngestionPipeline, VideoStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::middleware::JwtValidator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub videos: Arc<dyn VideoStore>,
    pub pipeline: Arc<IngestionPipeline>,
    pub jwt: JwtValidator,
    /// Directory served under `/assets`
    pub assets_root: PathBuf,
    /// Port used when building public asset URLs
    pub port: u16,
    pub presign_ttl: Duration,
}
