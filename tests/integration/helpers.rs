//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use sharebox_api::{AppState, build_app};
use sharebox_core::config::AppConfig;
use sharebox_core::traits::storage::WriteOptions;

/// Bearer token configured for the admin API in tests.
pub const ADMIN_TOKEN: &str = "test-admin-token";

const BOUNDARY: &str = "sharebox-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application state, for arranging fixtures directly
    pub state: AppState,
    /// Holds storage, staging, and the share store
    dir: TempDir,
}

impl TestApp {
    /// Create a new test application over an empty temp directory
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application, adjusting the configuration first
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.storage.root = dir.path().join("files").display().to_string();
        config.storage.resumable_root = dir.path().join("resumable").display().to_string();
        config.storage.data_dir = dir.path().display().to_string();
        config.admin.api_token = ADMIN_TOKEN.to_string();
        adjust(&mut config);

        let state = AppState::initialize(config)
            .await
            .expect("Failed to initialize state");
        let router = build_app(state.clone());

        Self { router, state, dir }
    }

    /// Absolute path of a stored file
    pub fn file_path(&self, key: &str) -> PathBuf {
        self.dir.path().join("files").join(key)
    }

    /// Staging directory of resumable uploads
    pub fn resumable_root(&self) -> PathBuf {
        self.dir.path().join("resumable")
    }

    /// Store a file directly through the storage provider
    pub async fn write_file(&self, key: &str, data: &[u8]) {
        self.state
            .storage
            .write(key, Bytes::copy_from_slice(data), WriteOptions::default())
            .await
            .expect("Failed to write fixture file");
    }

    /// Create a download share over `keys` and return its token
    pub async fn download_share(&self, keys: &[&str]) -> String {
        self.state
            .registry
            .create_download_share(keys.iter().map(|k| k.to_string()).collect(), None)
            .await
            .expect("Failed to create download share")
            .token
    }

    /// Create an upload share into `target` and return its token
    pub async fn upload_share(&self, target: &str, max_bytes: Option<u64>) -> String {
        self.state
            .registry
            .create_upload_share(None, max_bytes, target)
            .await
            .expect("Failed to create upload share")
            .token
    }

    /// Make a JSON request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// Make an admin JSON request
    pub async fn admin(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        self.request(method, path, body, Some(ADMIN_TOKEN)).await
    }

    /// Send a prepared request
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            bytes,
        }
    }

    /// GET or HEAD `path` with an optional `Range` header
    pub async fn fetch(&self, method: &str, path: &str, range: Option<&str>) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        if let Some(range) = range {
            req = req.header("Range", range);
        }
        self.send(req.body(Body::empty()).expect("Failed to build request"))
            .await
    }
}

/// Encode a `multipart/form-data` body, returning its content type.
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &[u8])]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body, `Null` when the body is not JSON
    pub body: Value,
    /// Raw body
    pub bytes: Bytes,
}

impl TestResponse {
    /// A header value as text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
