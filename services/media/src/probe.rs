//! Stream geometry inspection through ffprobe

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::command::ToolCommand;
use crate::config::PipelineConfig;
use crate::error::ToolError;
use crate::models::Geometry;

/// Extracts the geometry of the first video stream of a local file
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<Geometry, ToolError>;
}

/// [`MediaProbe`] backed by the ffprobe binary
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            program: config.ffprobe_path.clone(),
            timeout: config.tool_timeout,
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<Geometry, ToolError> {
        info!(path = %path.display(), "Probing staged upload");

        let output = ToolCommand::new(&self.program)
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .arg(path)
            .timeout(self.timeout)
            .run()
            .await?;

        parse_ffprobe_output(&output.stdout, path)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

/// Pick the first video stream out of ffprobe's JSON report
pub fn parse_ffprobe_output(json: &str, path: &Path) -> Result<Geometry, ToolError> {
    let malformed = |message: String| ToolError::MalformedOutput {
        tool: "ffprobe".to_string(),
        message,
    };

    let report: ProbeOutput =
        serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;

    // Older ffprobe builds omit codec_type; a stream with dimensions is video.
    let stream = report
        .streams
        .iter()
        .find(|s| match s.codec_type.as_deref() {
            Some(kind) => kind == "video",
            None => s.width.is_some(),
        })
        .ok_or_else(|| ToolError::NoVideoStream {
            path: path.to_path_buf(),
        })?;

    match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Ok(Geometry { width, height }),
        (width, height) => Err(malformed(format!(
            "video stream has unusable dimensions {:?}x{:?}",
            width, height
        ))),
    }
}
