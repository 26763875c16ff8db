//! End-to-end tests of the HTTP facade, driven through the router in-process.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ephemeral_server::http::create_router;
use ephemeral_server::{AppState, Config};

fn ready_app(config: Config) -> (Arc<AppState>, Router) {
    let state = AppState::new(&config);
    state.health.mark_ready();
    let router = create_router(state.clone());
    (state, router)
}

async fn send_raw(router: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, text) = send_raw(router, method, uri, body.map(|b| b.to_string())).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap()
    };
    (status, value)
}

async fn create(router: &Router, task_id: &str) -> (StatusCode, Value) {
    send(
        router,
        Method::POST,
        "/tasks",
        Some(json!({ "task_id": task_id, "data": {}, "priority": 1 })),
    )
    .await
}

#[tokio::test]
async fn test_task_lifecycle_over_http() {
    let (_, app) = ready_app(Config::default());

    let (status, created) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({ "task_id": "t1", "data": { "x": 1 }, "priority": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["data"], json!({ "x": 1 }));
    assert_eq!(created["priority"], 5);
    assert_eq!(created["created_at"], created["updated_at"]);

    let (status, running) = send(
        &app,
        Method::PUT,
        "/tasks/t1/status",
        Some(json!({ "status": "RUNNING" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(running["status"], "RUNNING");

    let (status, done) = send(
        &app,
        Method::PUT,
        "/tasks/t1/status",
        Some(json!({ "status": "COMPLETED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "COMPLETED");

    let (status, err) = send(
        &app,
        Method::PUT,
        "/tasks/t1/status",
        Some(json!({ "status": "RUNNING" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "INVALID_TRANSITION");
    assert_eq!(err["from"], "COMPLETED");
    assert_eq!(err["to"], "RUNNING");

    let (status, _) = send(&app, Method::DELETE, "/tasks/t1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = send(&app, Method::GET, "/tasks/t1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_create_rejects_duplicates_and_empty_ids() {
    let (state, app) = ready_app(Config::default());

    assert_eq!(create(&app, "dup").await.0, StatusCode::CREATED);
    let (status, err) = create(&app, "dup").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "CONFLICT");

    let (status, err) = create(&app, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "INVALID_ARGUMENT");

    assert_eq!(state.task_count(), 1);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (_, app) = ready_app(Config::default());

    let (status, text) = send_raw(&app, Method::POST, "/tasks", Some("{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(err["code"], "BAD_REQUEST");

    let (status, _) = send(&app, Method::POST, "/tasks", Some(json!({ "data": {} }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_task_is_not_found_for_every_operation() {
    let (_, app) = ready_app(Config::default());

    assert_eq!(send(&app, Method::GET, "/tasks/nope", None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(send(&app, Method::DELETE, "/tasks/nope", None).await.0, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        Method::PUT,
        "/tasks/nope/status",
        Some(json!({ "status": "RUNNING" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_reflects_deletes_and_filters() {
    let (_, app) = ready_app(Config::default());
    for id in ["a", "b", "c"] {
        create(&app, id).await;
    }
    send(&app, Method::DELETE, "/tasks/b", None).await;
    send(
        &app,
        Method::PUT,
        "/tasks/c/status",
        Some(json!({ "status": "FAILED" })),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let mut ids: Vec<&str> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["task_id"].as_str().unwrap())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "c"]);

    let (_, failed) = send(&app, Method::GET, "/tasks?status=failed", None).await;
    assert_eq!(failed["count"], 1);
    assert_eq!(failed["tasks"][0]["task_id"], "c");

    let (status, err) = send(&app, Method::GET, "/tasks?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_probes_follow_lifecycle() {
    let state = AppState::new(&Config::default());
    let app = create_router(state.clone());

    assert_eq!(send(&app, Method::GET, "/health/live", None).await.0, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not_ready");

    state.health.mark_ready();
    let (status, body) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    state.health.begin_drain();
    assert_eq!(
        send(&app, Method::GET, "/health/ready", None).await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(send(&app, Method::GET, "/health/live", None).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_withdrawn_at_capacity() {
    let config = Config {
        max_tasks: Some(1),
        ..Config::default()
    };
    let (_, app) = ready_app(config);

    assert_eq!(send(&app, Method::GET, "/health/ready", None).await.0, StatusCode::OK);
    create(&app, "only").await;
    assert_eq!(
        send(&app, Method::GET, "/health/ready", None).await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );

    let (status, health) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["ready"], false);
    assert_eq!(health["task_count"], 1);
    assert_eq!(health["environment"], "development");
}

#[tokio::test]
async fn test_metrics_endpoint_reports_counters() {
    let (_, app) = ready_app(Config::default());
    create(&app, "m1").await;
    send(&app, Method::GET, "/tasks/m1", None).await;
    send(&app, Method::DELETE, "/tasks/m1", None).await;

    let (status, text) = send_raw(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("ephemeral_tasks_created_total 1"));
    assert!(text.contains("ephemeral_tasks_deleted_total 1"));
    assert!(text.contains(
        "http_requests_total{method=\"POST\",endpoint=\"/tasks\",status_code=\"201\"} 1"
    ));
    assert!(text.contains(
        "http_requests_total{method=\"GET\",endpoint=\"/tasks/:task_id\",status_code=\"200\"} 1"
    ));
    assert!(text.contains("ephemeral_ready 1"));
}

#[tokio::test]
async fn test_background_processing_completes_task() {
    let config = Config {
        process_delay: Duration::from_millis(10),
        ..Config::default()
    };
    let (_, app) = ready_app(config);
    create(&app, "bg").await;

    let mut last = Value::Null;
    for _ in 0..200 {
        let (_, task) = send(&app, Method::GET, "/tasks/bg", None).await;
        if task["status"] == "COMPLETED" {
            last = task;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(last["status"], "COMPLETED");
    assert_eq!(last["result"]["message"], "Task completed successfully");
}

#[tokio::test]
async fn test_background_processing_keeps_client_lifecycle() {
    let config = Config {
        process_delay: Duration::from_secs(2),
        ..Config::default()
    };
    let (state, app) = ready_app(config);
    create(&app, "t1").await;
    tokio::task::yield_now().await;

    let (status, task) = send(&app, Method::GET, "/tasks/t1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "PENDING");
    assert_eq!(task["created_at"], task["updated_at"]);

    let (status, running) = send(
        &app,
        Method::PUT,
        "/tasks/t1/status",
        Some(json!({ "status": "RUNNING" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(running["status"], "RUNNING");

    state.processor.shutdown();
}

#[tokio::test]
async fn test_unknown_route_is_counted() {
    let (_, app) = ready_app(Config::default());

    let (status, err) = send(&app, Method::GET, "/nowhere/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NOT_FOUND");

    let (_, text) = send_raw(&app, Method::GET, "/metrics", None).await;
    assert!(text.contains(
        "http_requests_total{method=\"GET\",endpoint=\"unmatched\",status_code=\"404\"} 1"
    ));
    assert!(!text.contains("/nowhere/42"));
}

#[tokio::test]
async fn test_root_describes_service() {
    let (_, app) = ready_app(Config::default());
    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health"], "/health");
    assert_eq!(body["tasks"], 0);
}
