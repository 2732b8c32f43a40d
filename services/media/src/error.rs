//! Error types for the ingestion pipeline and its collaborators

use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Failure running an external media tool
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error waiting for {tool}: {source}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    /// Non-zero exit. Carries everything the process printed.
    #[error("{tool} exited with {status}: {stderr}, output: {stdout}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
        stdout: String,
    },

    #[error("unexpected {tool} output: {message}")]
    MalformedOutput { tool: String, message: String },

    #[error("no video streams found in {}", path.display())]
    NoVideoStream { path: PathBuf },
}

/// Scratch-area I/O failure
#[derive(Error, Debug)]
#[error("staging I/O error on {}: {source}", path.display())]
pub struct StagingError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl StagingError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Object store failure
#[derive(Error, Debug)]
pub enum StoreError {
    /// The local artifact could not be read for upload
    #[error("failed to read {} for upload: {message}", path.display())]
    Content { path: PathBuf, message: String },

    #[error("upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("presigning {key} failed: {message}")]
    Presign { key: String, message: String },
}

/// Metadata store failure
#[derive(Error, Debug)]
#[error("metadata store error: {0}")]
pub struct RecordStoreError(pub String);

/// Outcome taxonomy of the ingestion pipeline
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("upload exceeds the maximum accepted size")]
    PayloadTooLarge,

    #[error("{context}: {source}")]
    Internal {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("object storage unavailable: {0}")]
    UpstreamUnavailable(#[source] StoreError),
}

impl IngestError {
    pub fn internal(
        context: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        IngestError::Internal {
            context,
            source: source.into(),
        }
    }

    /// Only a failed transfer is the store's fault. Reading the staged file
    /// and signing URLs happen locally.
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Content { .. } => IngestError::internal("failed to read staged file", err),
            StoreError::Presign { .. } => IngestError::internal("failed to sign playback url", err),
            StoreError::Upload { .. } => IngestError::UpstreamUnavailable(err),
        }
    }
}

impl From<StagingError> for IngestError {
    fn from(err: StagingError) -> Self {
        IngestError::internal("staging failed", err)
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
