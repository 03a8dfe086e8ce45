#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use aurim_core::clock::ManualClock;
use aurim_core::credentials::Argon2Config;
use aurim_core::token::TokenConfig;
use axum::body::Body;
use axum::http::{HeaderValue, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use aurim_api::config::ServerConfig;
use aurim_api::router::build_app_router;
use aurim_api::state::AppState;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const MAX_TEST_UPLOAD: usize = 16 * 1024;
pub const BOUNDARY: &str = "aurim-test-boundary";

/// A running router plus the handles tests need to poke at it.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub avatar_dir: TempDir,
}

/// Build a test `ServerConfig` with safe defaults.
///
/// Argon2 costs are dropped to the minimum so registration stays fast.
pub fn test_config(avatar_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![HeaderValue::from_static("http://localhost:5173")],
        request_timeout_secs: 30,
        avatar_dir: avatar_dir.to_path_buf(),
        public_base_url: "http://localhost:8080".to_string(),
        max_avatar_bytes: MAX_TEST_UPLOAD,
        token: TokenConfig::new(TEST_SECRET).unwrap(),
        argon2: Argon2Config {
            time_cost: 1,
            memory_cost_kib: 64,
            parallelism: 1,
        },
    }
}

/// Build the full application router with the production middleware stack,
/// backed by in-memory stores, a manual clock and a temporary avatar dir.
pub fn build_test_app() -> TestApp {
    let avatar_dir = tempfile::tempdir().unwrap();
    let config = test_config(avatar_dir.path());
    let clock = Arc::new(ManualClock::starting_now());

    let state = AppState::new(config.clone(), clock.clone()).unwrap();
    let app = build_app_router(state.clone(), &config);

    TestApp {
        app,
        state,
        clock,
        avatar_dir,
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Register an account and return `(token, client_id)`.
pub async fn register(app: &Router, username: &str, email: &str, password: &str) -> (String, String) {
    let response = post_json(
        app,
        "/auth/register",
        serde_json::json!({ "username": username, "email": email, "password": password }),
    )
    .await;
    assert_eq!(response.status(), 200, "registration of {username} failed");
    let json = body_json(response).await;
    (
        json["token"].as_str().unwrap().to_string(),
        json["clientId"].as_str().unwrap().to_string(),
    )
}

/// A `multipart/form-data` body holding one file part.
pub fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart upload to `/avatar/upload` with optional session headers.
pub async fn upload(app: &Router, session: Option<(&str, &str)>, body: Vec<u8>) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/avatar/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some((token, client_id)) = session {
        builder = builder
            .header("authorization", format!("Bearer {token}"))
            .header("x-client-id", client_id);
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

/// A small PNG made with the `image` encoder.
pub fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(8, 8, |x, y| image::Rgb([(x * 20) as u8, (y * 20) as u8, 90]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}
