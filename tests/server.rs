mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::Router;
use cbir::server::{AppState, create_app};
use common::{Workspace, circle, png_bytes};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app(ws: &Workspace) -> Router {
    create_app(AppState::new(ws.engine().await, 6))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const BOUNDARY: &str = "cbir-test-boundary";

/// 构造只有一个 `file` 字段的 multipart 请求
fn post_file(uri: &str, file_name: &str, contents: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Request::post(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_list_images() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;
    let (status, body) = send(&app, get("/api/images/shapes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["circle.png", "square.png", "triangle.png"]));
}

#[tokio::test]
async fn test_unknown_collection() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;

    let (status, body) = send(&app, post_empty("/api/extract/unknown_type")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (status, body) = send(&app, post_json("/api/search/unknown_type", json!({"image": "a.png"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_extract_and_search() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;

    let (status, body) = send(&app, post_empty("/api/extract/shapes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["summary"]["succeeded"], json!(3));
    assert!(body["message"].is_string());

    let (status, body) =
        send(&app, post_json("/api/search/shapes", json!({"image": "circle.png", "top_k": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["query"], json!("circle.png"));
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    for item in results {
        let name = item["name"].as_str().unwrap();
        assert_ne!(name, "circle.png");
        assert_eq!(item["path"].as_str().unwrap(), format!("/images/shapes/{name}"));
        let similarity = item["similarity"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&similarity));
    }
}

#[tokio::test]
async fn test_search_default_top_k() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;
    send(&app, post_empty("/api/extract/shapes?force=true")).await;

    let (status, body) = send(&app, post_json("/api/search/shapes", json!({"image": "square.png"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_errors() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;
    send(&app, post_empty("/api/extract/shapes")).await;

    let (status, body) = send(&app, post_json("/api/search/shapes", json!({"image": "unknown.png"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());

    let (status, _) =
        send(&app, post_json("/api/search/shapes", json!({"image": "circle.png", "top_k": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, post_json("/api/search/shapes", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (status, _) = send(&app, post_empty("/api/search/shapes")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extract_invalid_query() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;

    let (status, body) = send(&app, post_empty("/api/extract/shapes?force=maybe")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_upload_then_search() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;
    send(&app, post_empty("/api/extract/shapes")).await;

    let request = post_file("/api/upload/shapes", "big_circle.png", &png_bytes(&circle(20)));
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["filename"], json!("big_circle.png"));

    let (status, body) = send(&app, get("/api/images/shapes")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().contains(&json!("big_circle.png")));

    let (status, body) =
        send(&app, post_json("/api/search/shapes", json!({"image": "big_circle.png", "top_k": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], json!("big_circle.png"));
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
    assert_eq!(body["results"][0]["name"], json!("circle.png"));
}

#[tokio::test]
async fn test_upload_rejected() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;

    let request = post_file("/api/upload/shapes", "notes.txt", b"hello");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let request = post_file("/api/upload/shapes", "broken.png", b"not an image");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("broken.png"));

    let request = post_file("/api/upload/unknown_type", "a.png", &png_bytes(&circle(10)));
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 没有 multipart 请求体
    let (status, body) = send(&app, post_empty("/api/upload/shapes")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (_, body) = send(&app, get("/api/images/shapes")).await;
    assert_eq!(body, json!(["circle.png", "square.png", "triangle.png"]));
}

#[tokio::test]
async fn test_serve_image() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;
    let response = app.clone().oneshot(get("/images/shapes/circle.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/images/shapes/missing.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics() {
    let ws = Workspace::with_shapes();
    let app = app(&ws).await;
    send(&app, post_empty("/api/extract/shapes")).await;
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("cbir_extract_image_count"));
}
