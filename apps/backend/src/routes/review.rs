//! Review queue endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::AppState;

const DEFAULT_QUEUE_LIMIT: usize = 20;

/// POST /api/review/misses
pub async fn record_miss(
    State(state): State<AppState>,
    Json(payload): Json<MissedAnswerRequest>,
) -> Result<(StatusCode, Json<ReviewItem>)> {
    let miss = payload.into_missed_answer(Utc::now());
    let item = state.scheduler.record_miss(miss).await?;
    let status = if item.version == 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(item)))
}

/// GET /api/review/queue
pub async fn queue(
    State(state): State<AppState>,
    Query(query): Query<ReviewQueueQuery>,
) -> Result<Json<ReviewQueueResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_QUEUE_LIMIT);
    let items = state
        .scheduler
        .get_items_for_review(query.user_id, limit)
        .await?;

    Ok(Json(ReviewQueueResponse {
        count: items.len(),
        items,
    }))
}

/// POST /api/review/items/:item_id/responses
pub async fn submit_response(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<SubmitResponseRequest>,
) -> Result<Json<ProcessedResponse>> {
    let response = payload.into_response(Utc::now());
    let processed = state.scheduler.process_response(item_id, response).await?;
    Ok(Json(processed))
}

/// POST /api/review/items/:item_id/hint
pub async fn increment_hint(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<HintLevelResponse>> {
    let hint_level = state.scheduler.increment_hint_level(item_id).await?;
    Ok(Json(HintLevelResponse {
        item_id,
        hint_level,
    }))
}

/// GET /api/review/stats
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<QueueStats>> {
    let stats = state.scheduler.get_queue_stats(query.user_id).await?;
    Ok(Json(stats))
}
