//! Schedule maintenance endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::models::*;
use crate::AppState;

/// POST /api/review/rebalance
pub async fn rebalance(
    State(state): State<AppState>,
    Json(payload): Json<RebalanceRequest>,
) -> Result<Json<RebalanceResponse>> {
    let moved = state
        .scheduler
        .rebalance_user(payload.user_id, payload.max_daily_reviews)
        .await?;
    Ok(Json(RebalanceResponse { moved }))
}

/// POST /api/review/cleanup
pub async fn cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    let mastered = state.scheduler.cleanup_mastered().await?;
    Ok(Json(CleanupResponse { mastered }))
}
