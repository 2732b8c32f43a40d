//! In-memory collaborators for handler tests

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{
        Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::Response,
};
use chrono::Utc;
use media::{
    FastStartRewriter, Geometry, IngestionPipeline, MediaProbe, NewVideo, ObjectStore,
    PipelineConfig, RecordStoreError, StoreError, ToolError, VideoRecord, VideoStore,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use crate::{
    middleware::{JwtValidator, issue_token},
    routes::create_router,
    state::AppState,
};

const SECRET: &str = "handler-test-secret";

#[derive(Default)]
pub struct MemoryVideos {
    records: Mutex<HashMap<Uuid, VideoRecord>>,
}

impl MemoryVideos {
    pub fn record(&self, id: Uuid) -> VideoRecord {
        self.records.lock().unwrap()[&id].clone()
    }
}

#[async_trait]
impl VideoStore for MemoryVideos {
    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>, RecordStoreError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn update_video(&self, video: &VideoRecord) -> Result<(), RecordStoreError> {
        self.records.lock().unwrap().insert(video.id, video.clone());
        Ok(())
    }

    async fn create_video(&self, video: NewVideo) -> Result<VideoRecord, RecordStoreError> {
        let now = Utc::now();
        let record = VideoRecord {
            id: Uuid::new_v4(),
            user_id: video.user_id,
            title: video.title,
            description: video.description,
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        };
        self.records.lock().unwrap().insert(record.id, record.clone());
        Ok(record)
    }
}

struct WideProbe;

#[async_trait]
impl MediaProbe for WideProbe {
    async fn probe(&self, _path: &Path) -> Result<Geometry, ToolError> {
        Ok(Geometry {
            width: 1920,
            height: 1080,
        })
    }
}

struct CopyRewriter;

#[async_trait]
impl FastStartRewriter for CopyRewriter {
    async fn rewrite(&self, input: &Path) -> Result<PathBuf, ToolError> {
        let output = self.output_path(input);
        std::fs::copy(input, &output).unwrap();
        Ok(output)
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<Vec<String>>,
}

impl MemoryObjectStore {
    pub fn put_keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        _bucket: &str,
        key: &str,
        _content: &Path,
        _content_type: &str,
    ) -> Result<(), StoreError> {
        self.objects.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, StoreError> {
        Ok(format!(
            "https://{bucket}.s3.amazonaws.com/{key}?X-Amz-Expires={}",
            ttl.as_secs()
        ))
    }
}

/// Router wired to in-memory collaborators and a private temp directory
pub struct TestApp {
    root: TempDir,
    pub owner: Uuid,
    pub videos: Arc<MemoryVideos>,
    pub store: Arc<MemoryObjectStore>,
    state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_video_limit(media::MAX_VIDEO_UPLOAD_BYTES)
    }

    /// App whose video routes accept at most `limit` bytes
    pub fn with_video_limit(limit: u64) -> Self {
        let root = tempfile::tempdir().unwrap();
        let videos = Arc::new(MemoryVideos::default());
        let store = Arc::new(MemoryObjectStore::default());

        let config = PipelineConfig::new("tubely-videos", "https://cdn.tubely.test")
            .with_scratch_dir(root.path().join("scratch"))
            .with_max_upload_bytes(limit);
        let pipeline = IngestionPipeline::new(
            &config,
            videos.clone(),
            Arc::new(WideProbe),
            Arc::new(CopyRewriter),
            store.clone(),
        );

        let state = AppState {
            videos: videos.clone(),
            pipeline: Arc::new(pipeline),
            jwt: JwtValidator::new(SECRET),
            assets_root: root.path().join("assets"),
            port: 8091,
            presign_ttl: Duration::from_secs(900),
        };

        Self {
            root,
            owner: Uuid::new_v4(),
            videos,
            store,
            state,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn bearer(&self, user: Uuid) -> String {
        format!("Bearer {}", issue_token(SECRET, user, 3600))
    }

    pub fn assets_root(&self) -> PathBuf {
        self.state.assets_root.clone()
    }

    pub fn scratch_is_empty(&self) -> bool {
        match std::fs::read_dir(self.root.path().join("scratch")) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    /// Insert a draft record owned by `owner`
    pub fn seed_video(&self, owner: Uuid) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.videos.records.lock().unwrap().insert(
            id,
            VideoRecord {
                id,
                user_id: owner,
                title: "Seeded".to_string(),
                description: String::new(),
                thumbnail_url: None,
                video_url: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }
}

/// Single-file multipart POST with a bearer token
pub fn multipart_request(
    uri: &str,
    bearer: &str,
    field: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    const BOUNDARY: &str = "tubely-test-boundary";

    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(AUTHORIZATION, bearer)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
