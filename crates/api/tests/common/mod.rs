#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use archivist_api::config::ServerConfig;
use archivist_api::router::build_app_router;
use archivist_api::state::AppState;
use archivist_pipeline::{IngestContext, PipelineSettings};

/// A test application over the in-memory pipeline.
///
/// Commits are not run inline; tests drive queued jobs through `ctx`.
pub struct TestApp {
    pub router: Router,
    pub ctx: IngestContext,
    pub dir: TempDir,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(ingest: PipelineSettings) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        inline_commit: false,
        ingest,
    }
}

pub fn build_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let settings = PipelineSettings::under(dir.path().join("work"));
    let config = test_config(settings.clone());
    let ctx = IngestContext::in_memory(settings);

    let state = AppState {
        ingest: ctx.clone(),
        pool: None,
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        ctx,
        dir,
    }
}

impl TestApp {
    /// Write a file into the app's temp directory and return its path.
    pub fn write(&self, name: &str, content: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body).await
}

pub async fn put_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::PUT, uri, body).await
}

async fn json_request(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
