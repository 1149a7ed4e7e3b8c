#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::Notify;
use tower::ServiceExt;
use vmodel_core::assets::AssetBag;
use vmodel_core::backend::{BackendError, ImageBackend, SniffingDecoder};
use vmodel_core::image_asset::ImageAsset;
use vmodel_gemini::GeminiConfig;
use vmodel_session::{SessionConfig, SessionController, SessionEvent};

use vmodel_api::config::ServerConfig;
use vmodel_api::router::build_app_router;
use vmodel_api::state::AppState;

/// The 8-byte PNG signature, enough for format sniffing.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n";

/// `PNG_BYTES` as a data URI.
pub const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        error_dismiss_secs: 5,
        max_upload_bytes: 1024 * 1024,
        gemini: GeminiConfig::new("test-key"),
    }
}

/// Backend answering every call with the next scripted result.
///
/// When gated, each call waits for one `Notify` permit before answering.
#[derive(Default)]
pub struct FakeBackend {
    results: Mutex<VecDeque<Result<ImageAsset, BackendError>>>,
    gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn returning(results: Vec<Result<ImageAsset, BackendError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    async fn next(&self) -> Result<ImageAsset, BackendError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Generation("no scripted result".into())))
    }
}

#[async_trait]
impl ImageBackend for FakeBackend {
    async fn generate(&self, _assets: &AssetBag, _prompt: &str) -> Result<ImageAsset, BackendError> {
        self.next().await
    }

    async fn edit(
        &self,
        _base: &ImageAsset,
        _prompt: &str,
        _references: &AssetBag,
    ) -> Result<ImageAsset, BackendError> {
        self.next().await
    }
}

pub fn png_asset() -> ImageAsset {
    ImageAsset::from_data_uri(PNG_DATA_URI).unwrap()
}

/// A router plus direct access to the session it drives.
pub struct TestApp {
    pub router: Router,
    pub session: Arc<SessionController>,
}

/// Build the full application router over `backend`, with the same
/// middleware stack production uses.
pub fn build_test_app(backend: FakeBackend) -> TestApp {
    let config = test_config();
    let session = Arc::new(SessionController::new(
        Arc::new(backend),
        Arc::new(SniffingDecoder),
        SessionConfig {
            error_dismiss_after: config.error_dismiss_after(),
        },
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        session: Arc::clone(&session),
    };

    TestApp {
        router: build_app_router(state, &config),
        session,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(empty_request(Method::GET, uri)).await
    }

    pub async fn post(&self, uri: &str) -> Response<Body> {
        self.send(empty_request(Method::POST, uri)).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(empty_request(Method::DELETE, uri)).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(json_request(Method::POST, uri, body)).await
    }

    pub async fn put_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(json_request(Method::PUT, uri, body)).await
    }

    pub async fn upload(&self, uri: &str, file_name: &str, bytes: &[u8]) -> Response<Body> {
        self.send(multipart_request(uri, file_name, bytes)).await
    }

    /// Wait until the session publishes an event matching `pred`.
    pub async fn wait_for(
        &self,
        mut events: tokio::sync::broadcast::Receiver<SessionEvent>,
        pred: impl Fn(&SessionEvent) -> bool,
    ) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = events.recv().await.unwrap();
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for session event")
    }
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn multipart_request(uri: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    const BOUNDARY: &str = "vmodel-test-boundary";

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
