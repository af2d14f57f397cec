use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use picsearch_core::persist::{save_index, IndexPaths};
use picsearch_core::{IndexBuilder, SearchConfig};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use tower::ServiceExt;

const SURROGATES: &str = r#"{
    "1": {"textual_surrogate": "a red car on the street", "url": "https://img.example/1.jpg"},
    "2": {"textual_surrogate": "red cars", "url": "https://img.example/2.jpg"},
    "3": {"textual_surrogate": "blue bicycle", "url": "https://img.example/3.jpg"}
}"#;

fn build_tiny_index(dir: &Path) -> (PathBuf, PathBuf) {
    let surrogates = dir.join("textual_surrogates.json");
    fs::write(&surrogates, SURROGATES).unwrap();

    let mut builder = IndexBuilder::new("textual_surrogate");
    builder.add_image("1", "https://img.example/1.jpg", "a red car on the street");
    builder.add_image("2", "https://img.example/2.jpg", "red cars");
    builder.add_image("3", "https://img.example/3.jpg", "blue bicycle");
    let index_dir = dir.join("image_index");
    save_index(&IndexPaths::new(&index_dir), &builder.finish(), "2024-01-01T00:00:00Z").unwrap();
    (index_dir, surrogates)
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let (index_dir, surrogates) = build_tiny_index(dir.path());
    let app = server::build_app(&index_dir, &surrogates, SearchConfig::default()).unwrap();

    let (status, body) = call(app, "/search?q=red%20car").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_results"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["image_id"], "1");
    assert_eq!(arr[0]["score"], 2);
    assert_eq!(arr[0]["url"], "https://img.example/1.jpg");
    assert_eq!(arr[1]["image_id"], "2");
    assert_eq!(arr[1]["score"], 1);
}

#[tokio::test]
async fn empty_query_returns_whole_corpus() {
    let dir = tempdir().unwrap();
    let (index_dir, surrogates) = build_tiny_index(dir.path());
    let app = server::build_app(&index_dir, &surrogates, SearchConfig::default()).unwrap();

    let (status, body) = call(app, "/search").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_results"], 3);
}

#[tokio::test]
async fn missing_surrogate_is_an_error_response() {
    let dir = tempdir().unwrap();
    let (index_dir, surrogates) = build_tiny_index(dir.path());
    fs::write(&surrogates, r#"{"1": {"textual_surrogate": "a red car", "url": "u1"}}"#).unwrap();
    let app = server::build_app(&index_dir, &surrogates, SearchConfig::default()).unwrap();

    let (status, body) = call(app, "/search?q=red").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("`2`"));
    assert!(json.get("results").is_none());
}

#[tokio::test]
async fn unreadable_surrogates_are_unavailable() {
    let dir = tempdir().unwrap();
    let (index_dir, surrogates) = build_tiny_index(dir.path());
    fs::remove_file(&surrogates).unwrap();
    let app = server::build_app(&index_dir, &surrogates, SearchConfig::default()).unwrap();

    let (status, _) = call(app, "/search?q=red").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempdir().unwrap();
    let (index_dir, surrogates) = build_tiny_index(dir.path());
    let app = server::build_app(&index_dir, &surrogates, SearchConfig::default()).unwrap();
    let (status, body) = call(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}
