//! API integration tests.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use recut_api::{create_router, ApiConfig, AppState};
use recut_media::testing::{Call, Reply, ScriptedRunner};

const CLIP: &[u8] = b"\x00\x00\x00\x18ftypmp42fake-clip-bytes";

fn test_router(runner: &Arc<ScriptedRunner>, dir: &TempDir) -> Router {
    let mut config = ApiConfig::default();
    config.trim = config.trim.with_temp_dir(dir.path());
    config.rate_limit_rps = 2;
    create_router(AppState::with_runner(config, runner.clone()), None)
}

fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn file_count(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).map(|e| e.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_trim_returns_mp4_with_headers() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new().on(Call::CopyExtract, Reply::ok().writes(CLIP)));

    let response = test_router(&runner, &dir)
        .oneshot(post_json(
            "/trim",
            json!({"url": "https://media.example.org/talk.mp4", "start": 10, "end": 20}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(headers[header::CONTENT_LENGTH], CLIP.len().to_string().as_str());
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"clip.mp4\""
    );
    assert_eq!(headers["x-trim-strategy"], "extract_direct");
    assert!(headers.contains_key("x-request-id"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], CLIP);
    assert_eq!(runner.call_kinds(), vec![Call::CopyExtract]);
    assert_eq!(file_count(&dir), 0);
}

#[tokio::test]
async fn test_trim_rejects_invalid_payloads() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());

    let bodies = [
        json!({"url": "", "start": 5, "end": 2}).to_string(),
        json!({"start": 1, "end": 2}).to_string(),
        json!({"url": "https://a.example/v.mp4", "start": "1", "end": 2}).to_string(),
        json!({"url": "https://a.example/v.mp4", "start": -1, "end": 2}).to_string(),
        json!({"url": "https://vimeo.com/1", "start": 1e20, "end": 2e20}).to_string(),
        "{not json".to_string(),
    ];

    for body in bodies {
        let response = test_router(&runner, &dir)
            .oneshot(post_json("/trim", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(body_json(response).await, json!({"error": "invalid payload"}));
    }

    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_trim_reports_missing_tool() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new().on(Call::Probe, Reply::Unavailable));

    let response = test_router(&runner, &dir)
        .oneshot(post_json(
            "/trim",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ", "start": 0, "end": 5}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "ToolUnavailable", "detail": "yt-dlp not installed on server"})
    );
    assert_eq!(runner.call_kinds(), vec![Call::Probe]);
}

#[tokio::test]
async fn test_trim_reports_exhausted_fallbacks() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(
        ScriptedRunner::new()
            .on(Call::Probe, Reply::ok())
            .on(Call::Resolve, Reply::fail("ERROR: private"))
            .on(Call::SectionDownload, Reply::fail("ERROR: private"))
            .on(Call::FullDownload, Reply::fail("ERROR: HTTP Error 403: Forbidden")),
    );

    let response = test_router(&runner, &dir)
        .oneshot(post_json(
            "/trim",
            json!({"url": "https://vimeo.com/1", "start": 0, "end": 5}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "DownloadFailed");
    assert_eq!(body["detail"], "ERROR: HTTP Error 403: Forbidden");
    assert_eq!(file_count(&dir), 0);
}

#[tokio::test]
async fn test_trim_status() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());

    let response = test_router(&runner, &dir)
        .oneshot(Request::builder().uri("/trim").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ok": true}));
}

#[tokio::test]
async fn test_process_suggestions() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());

    let response = test_router(&runner, &dir)
        .oneshot(post_json(
            "/process",
            json!({"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let clips = body["clips"].as_array().unwrap();
    assert_eq!(clips.len(), 3);
    assert_eq!(clips[0]["id"], "c1");
    assert_eq!(clips[0]["start"], 30.0);
    assert_eq!(
        clips[2]["thumbnail"],
        "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
    );
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_process_rejects_malformed_json() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());

    let response = test_router(&runner, &dir)
        .oneshot(post_json("/process", "{"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({"error": "invalid request"}));
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());

    let response = test_router(&runner, &dir)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_missing_tools() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    let mut config = ApiConfig::default();
    config.trim.ffmpeg_path = "recut-no-such-ffmpeg".to_string();
    config.trim.ytdlp_path = "recut-no-such-ytdlp".to_string();
    config.trim = config.trim.with_temp_dir(dir.path());

    let response = create_router(AppState::with_runner(config, runner), None)
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["ffmpeg"]["status"], "error");
    assert_eq!(body["checks"]["yt-dlp"]["status"], "error");
}

#[tokio::test]
async fn test_rate_limiting_per_client() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    let app = test_router(&runner, &dir);

    let mut limited = false;
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/trim")
                    .header("X-Forwarded-For", "192.168.1.100")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            assert_eq!(response.headers()[header::RETRY_AFTER], "1");
            limited = true;
            break;
        }
    }
    assert!(limited);

    // health is not rate limited
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Forwarded-For", "192.168.1.100")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());

    let response = test_router(&runner, &dir)
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "client-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "client-abc");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_concurrency_cap_still_serves_trims() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new().on(Call::CopyExtract, Reply::ok().writes(CLIP)));
    let mut config = ApiConfig::default();
    config.trim = config.trim.with_temp_dir(dir.path());
    config.max_concurrent_trims = 1;
    let app = create_router(AppState::with_runner(config, runner.clone()), None);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/trim",
                json!({"url": "https://media.example.org/a.mp4", "start": 0, "end": 1}).to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(runner.count(Call::CopyExtract), 2);
}
