//! Shared test helpers for API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use hybridfs_api::{AppState, build_router};
use hybridfs_core::config::{
    AppConfig, DatabaseConfig, LoggingConfig, ServerConfig, StorageConfig,
};
use hybridfs_database::MemoryStore;
use hybridfs_service::testing::{FakeBridge, FakeObjectStore};

const BOUNDARY: &str = "hybridfs-test-boundary";

/// Test application over an in-memory store and fake backends.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Rows behind the router
    pub store: MemoryStore,
    /// Fake bridge behind the router
    pub bridge: FakeBridge,
    /// Fake object store behind the router
    pub cloud: FakeObjectStore,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// `Location` header, if any
    pub location: Option<String>,
    /// Raw body
    pub bytes: Vec<u8>,
    /// Body parsed as JSON, or `Null`
    pub body: Value,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_seconds: 1,
            idle_timeout_seconds: 1,
            run_migrations: false,
        },
        storage: StorageConfig::default(),
        logging: LoggingConfig::default(),
    }
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = MemoryStore::new();
        let bridge = FakeBridge::new();
        let cloud = FakeObjectStore::new();

        let state = AppState::new(
            config,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(bridge.clone()),
            Arc::new(cloud.clone()),
        );

        Self {
            router: build_router(state),
            store,
            bridge,
            cloud,
        }
    }

    /// Send a JSON request (or a bodyless one when `body` is `None`).
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// Upload one file through the multipart endpoint.
    pub async fn upload(
        &self,
        owner: &str,
        folder_id: Option<&str>,
        location: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> TestResponse {
        let mut body = Vec::new();
        let mut text_field = |name: &str, value: &str| {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        };
        text_field("owner", owner);
        text_field("location", location);
        if let Some(folder_id) = folder_id {
            text_field("folder_id", folder_id);
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body")
            .to_vec();
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            location,
            bytes,
            body,
        }
    }
}
