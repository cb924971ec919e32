//! HTTP surface driven through the router with in-memory collaborators.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use firenews_api::build_router;
use firenews_core::testing::{article, MemoryStore, MockPredictor};
use firenews_core::FireNews;

fn router(store: Arc<MemoryStore>, predictor: MockPredictor) -> Router {
    let deps = FireNews::new(store, Arc::new(predictor), "v1.0.0", 100);
    build_router(deps, "http://localhost:3000")
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn submission() -> Value {
    json!({
        "title": "Bridge closed",
        "content": "The bridge is closed for repairs until March.",
        "source": "City Desk",
        "publishedAt": "2024-01-15"
    })
}

#[tokio::test]
async fn submit_returns_created_receipt() {
    let store = Arc::new(MemoryStore::new());
    let app = router(store.clone(), MockPredictor::returning(72, 0.91));

    let (status, body) = send(app, "POST", "/api/v1/partner/submit", Some(submission())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["article_id"].is_string());
    assert_eq!(body["fire_score"]["score"], 72);
    assert_eq!(body["fire_score"]["confidence"], 0.91);
    assert_eq!(body["fire_score"]["label"], "real");
    assert_eq!(body["fire_score"]["category"], "No risk detected");
}

#[tokio::test]
async fn submit_with_missing_fields_is_bad_request() {
    let store = Arc::new(MemoryStore::new());
    let app = router(store.clone(), MockPredictor::returning(72, 0.91));

    let (status, body) = send(
        app,
        "POST",
        "/api/v1/partner/submit",
        Some(json!({"content": "text", "publishedAt": "2024-01-15"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("title") && message.contains("source"));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn prediction_failure_is_server_error() {
    let app = router(
        Arc::new(MemoryStore::new()),
        MockPredictor::failing("torch missing"),
    );

    let (status, body) = send(app, "POST", "/api/v1/partner/submit", Some(submission())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to get FIRE score");
}

#[tokio::test]
async fn article_detail_and_missing_article() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert_article(&article("Story", Some(40), false));
    let app = router(store, MockPredictor::returning(50, 0.0));

    let (status, body) = send(app.clone(), "GET", &format!("/api/v1/articles/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["needsModeration"], false);
    assert_eq!(body["fire_score"]["score"], 40);
    assert_eq!(body["fire_score"]["category"], "Unverified");

    let (status, body) = send(app, "GET", "/api/v1/articles/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn report_then_queue_then_override() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert_article(&article("A1", Some(90), false));
    let app = router(store, MockPredictor::returning(50, 0.0));

    let (status, body) = send(
        app.clone(),
        "POST",
        &format!("/api/v1/articles/{id}/report"),
        Some(json!({"reason": "misleading"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "reported"}));

    let (_, queue) = send(app.clone(), "GET", "/api/v1/moderator/queue", None).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);
    assert_eq!(queue[0]["id"], id.as_str());

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/v1/moderator/override",
        Some(json!({
            "article_id": id,
            "new_label": "fake",
            "confidence": 0.5,
            "notes": "spam"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "article_id": id,
            "new_score": 25,
            "label": "fake",
            "category": "Likely misleading"
        })
    );

    let (_, queue) = send(app.clone(), "GET", "/api/v1/moderator/queue?limit=10", None).await;
    assert!(queue.as_array().unwrap().is_empty());

    let (status, notes) = send(app, "GET", &format!("/api/v1/articles/{id}/notes"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notes[0]["label"], "note_1");
    assert_eq!(notes[0]["note"], "spam");
}

#[tokio::test]
async fn report_without_body_is_accepted() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert_article(&article("A1", Some(60), false));
    let app = router(store, MockPredictor::returning(50, 0.0));

    let (status, _) = send(app, "POST", &format!("/api/v1/articles/{id}/report"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn override_with_unknown_label_is_bad_request() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert_article(&article("A1", Some(60), true));
    let app = router(store.clone(), MockPredictor::returning(50, 0.0));

    let (status, _) = send(
        app,
        "POST",
        "/api/v1/moderator/override",
        Some(json!({"article_id": id, "new_label": "satire"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn list_articles_caps_limit() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..3 {
        store.insert_article(&article(&format!("Story{i}"), Some(50), false));
    }
    let app = router(store, MockPredictor::returning(50, 0.0));

    let (status, body) = send(app.clone(), "GET", "/api/v1/articles?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(app, "GET", "/api/v1/articles?limit=1000", None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn health_is_ok() {
    let app = router(Arc::new(MemoryStore::new()), MockPredictor::returning(50, 0.0));
    let response = app
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
