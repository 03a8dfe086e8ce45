//! Integration tests for `/avatar`.

mod common;

use aurim_core::image_codec::{detect_format, ImageFormat};
use aurim_core::token::TOKEN_LIFETIME_DAYS;
use aurim_core::users::UserStore;
use axum::http::StatusCode;
use common::{
    body_bytes, body_json, build_test_app, get, multipart_body, register, sample_png, upload,
    MAX_TEST_UPLOAD,
};

#[tokio::test]
async fn upload_then_fetch_as_webp() {
    let t = build_test_app();
    let (token, client_id) = register(&t.app, "alice", "a@x.com", "p1").await;
    let user_id = t
        .state
        .accounts
        .users()
        .find_by_username("alice")
        .unwrap()
        .unwrap()
        .id;

    let response = upload(
        &t.app,
        Some((&token, &client_id)),
        multipart_body("avatar", "me.png", &sample_png()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(
        json["url"],
        format!("http://localhost:8080/avatar/get/{user_id}")
    );

    let files: Vec<_> = std::fs::read_dir(t.avatar_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec![format!("{user_id}.webp")]);

    let fetched = get(&t.app, &format!("/avatar/get/{user_id}")).await;
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(fetched.headers()["content-type"], "image/webp");
    assert_eq!(detect_format(&body_bytes(fetched).await), Some(ImageFormat::WebP));
}

#[tokio::test]
async fn missing_avatar_is_empty_404() {
    let t = build_test_app();
    let response = get(&t.app, "/avatar/get/123456").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn unsafe_owner_id_is_400() {
    let t = build_test_app();
    let response = get(&t.app, "/avatar/get/..%2Fsecret").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["reason"], "INVALID_IDENTIFIER");
}

#[tokio::test]
async fn upload_requires_session_headers() {
    let t = build_test_app();
    let response = upload(&t.app, None, multipart_body("avatar", "me.png", &sample_png())).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["reason"], "UNAUTHORIZED");
}

#[tokio::test]
async fn upload_with_other_client_id_is_rejected() {
    let t = build_test_app();
    let (token, _) = register(&t.app, "alice", "a@x.com", "p1").await;

    let response = upload(
        &t.app,
        Some((&token, "not-the-issued-client-id")),
        multipart_body("avatar", "me.png", &sample_png()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["reason"], "INVALID_TOKEN");
}

#[tokio::test]
async fn upload_with_expired_token_is_rejected() {
    let t = build_test_app();
    let (token, client_id) = register(&t.app, "alice", "a@x.com", "p1").await;
    t.clock
        .advance(chrono::Duration::days(TOKEN_LIFETIME_DAYS + 1));

    let response = upload(
        &t.app,
        Some((&token, &client_id)),
        multipart_body("avatar", "me.png", &sample_png()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["reason"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn non_image_upload_is_unrecognized() {
    let t = build_test_app();
    let (token, client_id) = register(&t.app, "alice", "a@x.com", "p1").await;

    let response = upload(
        &t.app,
        Some((&token, &client_id)),
        multipart_body("avatar", "notes.txt", b"hello, not an image"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["reason"], "UNRECOGNIZED_FORMAT");
}

#[tokio::test]
async fn missing_avatar_part_is_bad_request() {
    let t = build_test_app();
    let (token, client_id) = register(&t.app, "alice", "a@x.com", "p1").await;

    let response = upload(
        &t.app,
        Some((&token, &client_id)),
        multipart_body("picture", "me.png", &sample_png()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["reason"], "BAD_REQUEST");
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let t = build_test_app();
    let (token, client_id) = register(&t.app, "alice", "a@x.com", "p1").await;
    let huge = vec![0u8; MAX_TEST_UPLOAD * 2];

    let response = upload(
        &t.app,
        Some((&token, &client_id)),
        multipart_body("avatar", "huge.png", &huge),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
