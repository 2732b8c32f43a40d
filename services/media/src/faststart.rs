//! Fast-start remux through ffmpeg

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::command::ToolCommand;
use crate::config::PipelineConfig;
use crate::error::ToolError;

/// Suffix appended to the input path to name the remuxed copy
pub const FASTSTART_SUFFIX: &str = ".processing";

/// Path the remuxed copy of `input` is written to
pub fn faststart_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(FASTSTART_SUFFIX);
    PathBuf::from(path)
}

/// Produces a copy of a staged file with its metadata atom moved to the
/// front. The input file is left in place.
#[async_trait]
pub trait FastStartRewriter: Send + Sync {
    /// Where [`FastStartRewriter::rewrite`] will write its output
    fn output_path(&self, input: &Path) -> PathBuf {
        faststart_path(input)
    }

    async fn rewrite(&self, input: &Path) -> Result<PathBuf, ToolError>;
}

/// [`FastStartRewriter`] backed by the ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegFastStart {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegFastStart {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            program: config.ffmpeg_path.clone(),
            timeout: config.tool_timeout,
        }
    }

    fn command(&self, input: &Path, output: &Path) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-c")
            .arg("copy")
            .arg("-movflags")
            .arg("faststart")
            .arg("-f")
            .arg("mp4")
            .arg(output)
            .timeout(self.timeout)
    }
}

#[async_trait]
impl FastStartRewriter for FfmpegFastStart {
    async fn rewrite(&self, input: &Path) -> Result<PathBuf, ToolError> {
        let output = self.output_path(input);
        info!(input = %input.display(), output = %output.display(), "Remuxing for fast start");

        self.command(input, &output).run().await?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_appends_suffix() {
        let output = faststart_path(Path::new("/scratch/upload-abc.mp4"));
        assert_eq!(output, PathBuf::from("/scratch/upload-abc.mp4.processing"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_carries_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-ffmpeg");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'Input #0, mov,mp4'\necho 'moov atom not found' >&2\nexit 1\n",
        )
        .unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let mut config = PipelineConfig::new("bucket", "https://cdn.example");
        config.ffmpeg_path = script;
        let rewriter = FfmpegFastStart::new(&config);

        let err = rewriter
            .rewrite(&dir.path().join("upload.mp4"))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("moov atom not found"), "{message}");
        assert!(message.contains("Input #0"), "{message}");
    }
}
