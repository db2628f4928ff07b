#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use vireo::app::assets::AssetLayout;
use vireo::domain::video::Video;
use vireo::http::issue_token;
use vireo::infra::db::VideoStore;
use vireo::infra::media::{processed_path, AspectRatio, MediaToolError, MediaTools};
use vireo::infra::storage::ObjectStore;
use vireo::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-not-for-production";
pub const TEST_CDN_HOST: &str = "cdn.test.example";
pub const TEST_BASE_URL: &str = "http://localhost:8080";
const BOUNDARY: &str = "vireo-test-boundary";

// ---------------------------------------------------------------------------
// In-memory fakes over the collaborator seams
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryVideoStore {
    pub videos: Mutex<HashMap<Uuid, Video>>,
}

impl MemoryVideoStore {
    pub fn insert(&self, video: Video) {
        self.videos.lock().unwrap().insert(video.id, video);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Video> {
        self.videos.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Video>> {
        Ok(self.videos.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, video: &Video) -> anyhow::Result<()> {
        self.videos.lock().unwrap().insert(video.id, video.clone());
        Ok(())
    }
}

pub struct StoredObject {
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    pub objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                data: body,
            },
        );
        Ok(())
    }
}

/// Canned media tools: classification is configurable, remuxing copies the
/// staged file to the derived output path. Either step can be told to fail
/// so cleanup-on-error paths are reachable from tests.
pub struct StubMediaTools {
    pub ratio: Mutex<AspectRatio>,
    pub fail_probe: AtomicBool,
    pub fail_remux: AtomicBool,
}

impl Default for StubMediaTools {
    fn default() -> Self {
        Self {
            ratio: Mutex::new(AspectRatio::Landscape),
            fail_probe: AtomicBool::new(false),
            fail_remux: AtomicBool::new(false),
        }
    }
}

impl StubMediaTools {
    pub fn set_ratio(&self, ratio: AspectRatio) {
        *self.ratio.lock().unwrap() = ratio;
    }
}

#[async_trait]
impl MediaTools for StubMediaTools {
    async fn probe_aspect_ratio(&self, input: &Path) -> Result<AspectRatio, MediaToolError> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(MediaToolError::Probe("stub probe failure".to_string()));
        }
        if !input.exists() {
            return Err(MediaToolError::MalformedMedia);
        }
        Ok(*self.ratio.lock().unwrap())
    }

    async fn remux_fast_start(&self, input: &Path) -> Result<PathBuf, MediaToolError> {
        if self.fail_remux.load(Ordering::SeqCst) {
            return Err(MediaToolError::Remux("stub remux failure".to_string()));
        }
        let output = processed_path(input);
        std::fs::copy(input, &output)?;
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// TestApp — fresh instance per test, no external services required
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub videos: Arc<MemoryVideoStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub media: Arc<StubMediaTools>,
    assets_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    pub fn is_empty_body(&self) -> bool {
        self.body_bytes.is_empty()
    }

    pub fn body(&self) -> &[u8] {
        &self.body_bytes
    }
}

impl TestApp {
    pub fn spawn() -> Self {
        let assets_dir = TempDir::new().expect("create assets dir");
        let layout = AssetLayout::new(assets_dir.path(), TEST_BASE_URL, TEST_CDN_HOST);
        layout.ensure_dirs().expect("ensure asset dirs");

        let videos = Arc::new(MemoryVideoStore::default());
        let objects = Arc::new(MemoryObjectStore::default());
        let media = Arc::new(StubMediaTools::default());

        let state = AppState {
            videos: videos.clone(),
            storage: objects.clone(),
            media: media.clone(),
            assets: layout,
            jwt_secret: TEST_JWT_SECRET.to_string(),
        };

        let router = vireo::http::router(state.clone());

        TestApp {
            router,
            state,
            videos,
            objects,
            media,
            assets_dir,
        }
    }

    // ------------------------------------------------------------------
    // Request helpers
    // ------------------------------------------------------------------

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header("host", "localhost");
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {}", t));
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// POST a multipart body carrying one file field.
    pub async fn upload(
        &self,
        path: &str,
        field_name: &str,
        content_type: &str,
        data: &[u8],
        token: Option<&str>,
    ) -> TestResponse {
        let body = multipart_body(field_name, content_type, data);
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("host", "localhost")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {}", t));
        }
        self.request(builder.body(Body::from(body)).unwrap()).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Insert a video record owned by the given user. Returns the record.
    pub fn create_video(&self, owner_id: Uuid) -> Video {
        let video = Video {
            id: Uuid::new_v4(),
            user_id: owner_id,
            title: "test video".to_string(),
            description: "a test fixture".to_string(),
            thumbnail_url: None,
            video_url: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.videos.insert(video.clone());
        video
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        issue_token(user_id, TEST_JWT_SECRET, Duration::from_secs(3600))
            .expect("issue test token")
    }

    // ------------------------------------------------------------------
    // Filesystem assertions
    // ------------------------------------------------------------------

    pub fn assets_root(&self) -> PathBuf {
        self.assets_dir.path().to_path_buf()
    }

    /// Entries left in temporary storage (staging dirs and their contents).
    pub fn tmp_entries(&self) -> Vec<PathBuf> {
        let tmp = self.state.assets.tmp_root();
        let mut entries = Vec::new();
        collect_entries(&tmp, &mut entries);
        entries
    }

    /// Files stored permanently under the assets root, excluding tmp.
    pub fn stored_asset_files(&self) -> Vec<PathBuf> {
        let tmp = self.state.assets.tmp_root();
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(self.assets_dir.path()).expect("read assets root") {
            let path = entry.expect("read dir entry").path();
            if path == tmp {
                continue;
            }
            entries.push(path);
        }
        entries
    }
}

fn collect_entries(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_entries(&path, out);
        }
        out.push(path);
    }
}

pub fn multipart_body(field_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\n",
            field_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}
