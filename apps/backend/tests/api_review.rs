//! Review queue API tests.
//!
//! These run against the in-memory repository.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;
use uuid::Uuid;

use common::fixtures;
use common::TestContext;

async fn server() -> (TestContext, TestServer) {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    (ctx, server)
}

async fn ingest(server: &TestServer, user_id: Uuid, question_id: &str, days_ago: i64) -> Value {
    let response = server
        .post("/api/review/misses")
        .json(&fixtures::miss_request(
            user_id,
            question_id,
            fixtures::days_ago(days_ago),
        ))
        .await;
    response.json()
}

/// Test the health endpoint.
#[tokio::test]
async fn test_health() {
    let (_ctx, server) = server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

/// Test first miss creates a pending item.
#[tokio::test]
async fn test_record_miss_creates_item() {
    let (ctx, server) = server().await;
    let user_id = TestContext::new_user();

    let response = server
        .post("/api/review/misses")
        .json(&fixtures::miss_request(
            user_id,
            "lr-assum-012",
            fixtures::days_ago(0),
        ))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["interval_days"], 1);
    assert_eq!(body["ease_factor"], 2.5);
    assert_eq!(body["incorrect_attempts"], 1);
    assert_eq!(body["section"], "reasoning");
    assert_eq!(ctx.repo.item_count().await, 1);
}

/// Test a second miss updates the same item.
#[tokio::test]
async fn test_repeat_miss_updates_item() {
    let (ctx, server) = server().await;
    let user_id = TestContext::new_user();

    let first = ingest(&server, user_id, "lr-assum-012", 3).await;

    let response = server
        .post("/api/review/misses")
        .json(&fixtures::miss_request(
            user_id,
            "lr-assum-012",
            fixtures::days_ago(1),
        ))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["item_id"], first["item_id"]);
    assert_eq!(body["incorrect_attempts"], 2);
    assert_eq!(ctx.repo.item_count().await, 1);
}

/// Test unknown question is rejected without creating an item.
#[tokio::test]
async fn test_record_miss_missing_metadata() {
    let (ctx, server) = server().await;

    let response = server
        .post("/api/review/misses")
        .json(&fixtures::miss_request(
            TestContext::new_user(),
            "rc-unknown-404",
            fixtures::days_ago(0),
        ))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "missing_metadata");
    assert_eq!(ctx.repo.item_count().await, 0);
}

/// Test a correct answer cannot be ingested as a miss.
#[tokio::test]
async fn test_record_miss_rejects_correct_answer() {
    let (_ctx, server) = server().await;

    let mut request =
        fixtures::miss_request(TestContext::new_user(), "lr-assum-012", fixtures::days_ago(0));
    request["quality"] = serde_json::json!(4);

    let response = server.post("/api/review/misses").json(&request).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "validation_error");
}

/// Test the queue is empty for a new learner.
#[tokio::test]
async fn test_queue_empty() {
    let (_ctx, server) = server().await;

    let response = server
        .get("/api/review/queue")
        .add_query_param("user_id", TestContext::new_user())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 0);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
}

/// Test due items come back most urgent first, limited and explained.
#[tokio::test]
async fn test_queue_ordering_and_limit() {
    let (_ctx, server) = server().await;
    let user_id = TestContext::new_user();

    ingest(&server, user_id, "lr-principle-031", 6).await;
    let urgent = ingest(&server, user_id, "lg-grouping-019", 2).await;
    ingest(&server, user_id, "rc-detail-007", 5).await;
    // Not due yet.
    ingest(&server, user_id, "lr-assum-012", 0).await;

    let response = server
        .get("/api/review/queue")
        .add_query_param("user_id", user_id)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 3);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items[0]["item"]["item_id"], urgent["item_id"]);
    let scores: Vec<f64> = items
        .iter()
        .map(|i| i["ranking"]["score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(items[0]["ranking"]["explanation"].is_array());

    let response = server
        .get("/api/review/queue")
        .add_query_param("user_id", user_id)
        .add_query_param("limit", 1)
        .await;
    let body: Value = response.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["item"]["item_id"], urgent["item_id"]);
}

/// Test a failed review keeps the floor interval.
#[tokio::test]
async fn test_submit_failed_response() {
    let (_ctx, server) = server().await;
    let user_id = TestContext::new_user();
    let item = ingest(&server, user_id, "lr-assum-012", 2).await;
    let item_id = item["item_id"].as_str().unwrap();

    let response = server
        .post(&format!("/api/review/items/{item_id}/responses"))
        .json(&fixtures::response_request(2, fixtures::days_ago(0)))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["item"]["interval_days"], 1);
    assert_eq!(body["item"]["consecutive_correct"], 0);
    assert_eq!(body["item"]["status"], "active");
    assert_eq!(body["stage"], "learning");
    assert_eq!(body["graduated"], false);
}

/// Test a correct review extends the interval and updates mastery.
#[tokio::test]
async fn test_submit_correct_response() {
    let (_ctx, server) = server().await;
    let user_id = TestContext::new_user();
    let item = ingest(&server, user_id, "rc-detail-007", 2).await;
    let item_id = item["item_id"].as_str().unwrap();

    let response = server
        .post(&format!("/api/review/items/{item_id}/responses"))
        .json(&fixtures::response_request(5, fixtures::days_ago(0)))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["item"]["consecutive_correct"], 1);
    assert_eq!(body["item"]["total_attempts"], 2);
    assert!(body["item"]["mastery_level"].as_f64().unwrap() > 0.0);
    assert!(body["item"]["ease_factor"].as_f64().unwrap() >= 2.5);
    assert_eq!(body["item"]["version"], 1);
}

/// Test out-of-range quality is rejected.
#[tokio::test]
async fn test_submit_invalid_quality() {
    let (ctx, server) = server().await;
    let user_id = TestContext::new_user();
    let item = ingest(&server, user_id, "lr-assum-012", 2).await;
    let item_id: Uuid = item["item_id"].as_str().unwrap().parse().unwrap();

    let response = server
        .post(&format!("/api/review/items/{item_id}/responses"))
        .json(&fixtures::response_request(7, fixtures::days_ago(0)))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let stored = ctx.scheduler.get_queue_stats(user_id).await.unwrap();
    assert_eq!(stored.total_items, 1);
    assert_eq!(stored.accuracy, 0.0);
}

/// Test response for unknown item.
#[tokio::test]
async fn test_submit_unknown_item() {
    let (_ctx, server) = server().await;

    let response = server
        .post(&format!("/api/review/items/{}/responses", Uuid::new_v4()))
        .json(&fixtures::response_request(4, fixtures::days_ago(0)))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "item_not_found");
}

/// Test hint level increments and is reported back.
#[tokio::test]
async fn test_increment_hint_level() {
    let (_ctx, server) = server().await;
    let item = ingest(&server, TestContext::new_user(), "lg-grouping-019", 1).await;
    let item_id = item["item_id"].as_str().unwrap();

    server
        .post(&format!("/api/review/items/{item_id}/hint"))
        .await
        .assert_status_ok();
    let response = server
        .post(&format!("/api/review/items/{item_id}/hint"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["hint_level"], 2);

    let response = server
        .post(&format!("/api/review/items/{}/hint", Uuid::new_v4()))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

/// Test queue statistics.
#[tokio::test]
async fn test_stats() {
    let (_ctx, server) = server().await;
    let user_id = TestContext::new_user();
    let item = ingest(&server, user_id, "lr-assum-012", 2).await;
    ingest(&server, user_id, "rc-detail-007", 0).await;
    let item_id = item["item_id"].as_str().unwrap();

    server
        .post(&format!("/api/review/items/{item_id}/responses"))
        .json(&fixtures::response_request(4, fixtures::days_ago(0)))
        .await
        .assert_status_ok();

    let response = server
        .get("/api/review/stats")
        .add_query_param("user_id", user_id)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total_items"], 2);
    assert_eq!(body["pending_review"], 0);
    assert_eq!(body["mastered_items"], 0);
    // 3 attempts, 2 misses.
    let accuracy = body["accuracy"].as_f64().unwrap();
    assert!((accuracy - 1.0 / 3.0).abs() < 1e-9);
}
