//! API models for request and response payloads

use serde::{Deserialize, Serialize};

/// Request for creating a draft video record
#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Response carrying a time-limited playback URL
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaybackResponse {
    pub url: String,
    pub expires_in: u64,
}
