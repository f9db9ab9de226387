//! Test fixtures and factory functions for creating test data.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use review_scheduler_backend::models::{QuestionMetadata, Section};

/// Questions known to the in-memory question bank.
pub fn question_bank() -> Vec<(&'static str, QuestionMetadata)> {
    vec![
        (
            "lr-assum-012",
            QuestionMetadata {
                section: Section::Reasoning,
                question_type: "assumption".to_string(),
                difficulty: 6,
            },
        ),
        (
            "lr-principle-031",
            QuestionMetadata {
                section: Section::Reasoning,
                question_type: "principle".to_string(),
                difficulty: 3,
            },
        ),
        (
            "rc-detail-007",
            QuestionMetadata {
                section: Section::Comprehension,
                question_type: "detail".to_string(),
                difficulty: 4,
            },
        ),
        (
            "lg-grouping-019",
            QuestionMetadata {
                section: Section::Games,
                question_type: "grouping".to_string(),
                difficulty: 9,
            },
        ),
    ]
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// Body for POST /api/review/misses.
pub fn miss_request(user_id: Uuid, question_id: &str, at: DateTime<Utc>) -> Value {
    json!({
        "user_id": user_id,
        "question_id": question_id,
        "quality": 1,
        "confidence": "medium",
        "time_spent_seconds": 95.0,
        "timestamp": at,
    })
}

/// Body for POST /api/review/items/:item_id/responses.
pub fn response_request(quality: u8, at: DateTime<Utc>) -> Value {
    json!({
        "quality": quality,
        "confidence": "high",
        "time_spent_seconds": 80.0,
        "hints_used": 0,
        "timestamp": at,
    })
}
