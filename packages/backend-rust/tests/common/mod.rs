#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use prepmate_algo::ModelConfig;
use prepmate_backend::db::LearnerStore;
use serde_json::Value;
use tower::ServiceExt;

pub fn create_test_app() -> Router {
    create_test_app_with_store(LearnerStore::memory())
}

pub fn create_test_app_with_store(store: LearnerStore) -> Router {
    prepmate_backend::create_app_with_store(store, ModelConfig::default())
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await
}

/// `count` attempts with the same outcome on one topic, in one batch.
pub async fn seed_attempts(app: &Router, user_id: &str, topic_id: &str, correct: bool, count: usize) {
    let attempts: Vec<Value> = (0..count)
        .map(|_| serde_json::json!({ "correct": correct, "difficulty": 3 }))
        .collect();
    let (status, _) = post_json(
        app,
        "/api/ml/mastery/update",
        serde_json::json!({ "user_id": user_id, "topic_id": topic_id, "attempts": attempts }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
