//! Media ingestion core for the Joy Kunga application
//!
//! Takes an uploaded video from the HTTP layer through staging, stream
//! inspection, fast-start remuxing and object storage, then records the
//! public URL on the video's metadata record.

pub mod command;
pub mod config;
pub mod error;
pub mod faststart;
pub mod models;
pub mod object_store;
pub mod pipeline;
pub mod probe;
pub mod staging;
pub mod store;

pub use config::{ACCEPTED_VIDEO_TYPE, MAX_VIDEO_UPLOAD_BYTES, PipelineConfig};
pub use error::{IngestError, IngestResult, RecordStoreError, StoreError, ToolError};
pub use faststart::{FastStartRewriter, FfmpegFastStart};
pub use models::{AspectClass, Geometry, MediaType, NewVideo, ObjectKey, VideoRecord, random_token};
pub use object_store::{ObjectStore, S3ObjectStore};
pub use pipeline::IngestionPipeline;
pub use probe::{FfprobeProbe, MediaProbe};
pub use staging::{StagedFile, StagingArea};
pub use store::{VideoStore, load_owned};
