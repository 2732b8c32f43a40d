//! Durable object storage for finished videos

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{Client, presigning::PresigningConfig, primitives::ByteStream};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::error::StoreError;

/// Remote object storage
///
/// `put` is a single full-object transfer and silently replaces whatever is
/// stored under the key. `presign` does not check that the object exists.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content: &Path,
        content_type: &str,
    ) -> Result<(), StoreError>;

    async fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, StoreError>;
}

/// [`ObjectStore`] on Amazon S3 or an S3-compatible endpoint
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain
    ///
    /// # Arguments
    /// * `region` - AWS region, or the region identifier of an S3-compatible provider
    /// * `endpoint_url` - Custom endpoint (MinIO and friends); enables path-style addressing
    pub async fn connect(region: String, endpoint_url: Option<String>) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        let client = match endpoint_url {
            Some(endpoint) => {
                let config = aws_sdk_s3::config::Builder::from(&sdk_config)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                Client::from_conf(config)
            }
            None => Client::new(&sdk_config),
        };

        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content: &Path,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let start = Instant::now();
        let body = ByteStream::from_path(content)
            .await
            .map_err(|e| StoreError::Content {
                path: content.to_path_buf(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "S3 upload failed"
                );
                StoreError::Upload {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;

        info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_millis() as u64,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, StoreError> {
        let presign_error = |message: String| StoreError::Presign {
            key: key.to_string(),
            message,
        };

        let presigning_config =
            PresigningConfig::expires_in(ttl).map_err(|e| presign_error(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| presign_error(e.to_string()))?;

        Ok(request.uri().to_string())
    }
}
