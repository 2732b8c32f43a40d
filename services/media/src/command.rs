//! Runs external media tools with a hard timeout.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error};

use crate::error::ToolError;

/// Default ceiling for a single tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

/// Output captured from a successful tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// An external tool invocation.
///
/// The child is spawned with `kill_on_drop`, so when the timeout fires and
/// the wait future is dropped the process is killed rather than left behind.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Short name used in logs and error messages.
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run to completion, failing on spawn errors, timeouts and non-zero exits.
    pub async fn run(&self) -> Result<ToolOutput, ToolError> {
        let tool = self.tool_name();
        debug!(tool = %tool, args = ?self.args, "running external tool");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(ToolError::Wait { tool, source }),
            Err(_elapsed) => {
                error!(tool = %tool, timeout = ?self.timeout, "external tool timed out and was killed");
                return Err(ToolError::Timeout {
                    tool,
                    timeout: self.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            error!(tool = %tool, status = %output.status, "external tool failed");
            return Err(ToolError::Failed {
                tool,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
                stdout: stdout.trim().to_string(),
            });
        }

        Ok(ToolOutput {
            status: output.status,
            stdout,
            stderr,
        })
    }
}
