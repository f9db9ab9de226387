//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ApiError, Result};

// Re-export shared types from review-core
pub use review_core::types::{
    Confidence, ItemMetadata, ItemStatus, MasteryStage, MasteryTracker, QuestionMetadata,
    ReviewItem, ReviewResponse, Section,
};
pub use review_core::{PriorityRanking, QueueStats, RankedItem};

// === Database Entity Types ===

/// Review item stored in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbReviewItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question_id: String,
    pub section: String,
    pub question_type: String,
    pub difficulty: i32,
    pub interval_days: i32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub mastery_level: f64,
    pub incorrect_attempts: i32,
    pub total_attempts: i32,
    pub consecutive_correct: i32,
    pub last_attempted_at: DateTime<Utc>,
    pub last_missed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub priority_score: f64,
    pub status: String,
    pub hint_level: i32,
    pub version: i64,
}

impl DbReviewItem {
    /// Convert to review-core ReviewItem
    pub fn to_core_item(&self) -> Result<ReviewItem> {
        let section = Section::from_str(&self.section).ok_or_else(|| {
            ApiError::Internal(format!("unknown section '{}' on item {}", self.section, self.id))
        })?;
        let status = ItemStatus::from_str(&self.status).ok_or_else(|| {
            ApiError::Internal(format!("unknown status '{}' on item {}", self.status, self.id))
        })?;

        Ok(ReviewItem {
            item_id: self.id,
            question_id: self.question_id.clone(),
            user_id: self.user_id,
            section,
            question_type: self.question_type.clone(),
            difficulty: self.difficulty.clamp(1, 10) as u8,
            interval_days: self.interval_days.max(0) as u32,
            ease_factor: self.ease_factor,
            next_review_at: self.next_review_at,
            mastery_level: self.mastery_level,
            incorrect_attempts: self.incorrect_attempts.max(0) as u32,
            total_attempts: self.total_attempts.max(0) as u32,
            consecutive_correct: self.consecutive_correct.max(0) as u32,
            last_attempted_at: self.last_attempted_at,
            last_missed_at: self.last_missed_at,
            created_at: self.created_at,
            priority_score: self.priority_score,
            status,
            metadata: ItemMetadata {
                hint_level: self.hint_level.max(0) as u32,
            },
            version: self.version,
        })
    }
}

/// Mastery tracker stored in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbMasteryTracker {
    pub item_id: Uuid,
    pub current_level: f64,
    pub target_level: f64,
    pub consecutive_correct: i32,
    pub required_consecutive: i32,
    pub attempt_count: i32,
    pub minimum_attempts: i32,
    pub stage: String,
    pub mastery_achieved_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl DbMasteryTracker {
    /// Convert to review-core MasteryTracker
    pub fn to_core_tracker(&self) -> Result<MasteryTracker> {
        let stage = MasteryStage::from_str(&self.stage).ok_or_else(|| {
            ApiError::Internal(format!(
                "unknown mastery stage '{}' on item {}",
                self.stage, self.item_id
            ))
        })?;

        Ok(MasteryTracker {
            item_id: self.item_id,
            current_level: self.current_level,
            target_level: self.target_level,
            consecutive_correct: self.consecutive_correct.max(0) as u32,
            required_consecutive: self.required_consecutive.max(0) as u32,
            attempt_count: self.attempt_count.max(0) as u32,
            minimum_attempts: self.minimum_attempts.max(0) as u32,
            stage,
            mastery_achieved_at: self.mastery_achieved_at,
        })
    }
}

/// Question bank row. Section and difficulty may be absent upstream.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbQuestion {
    pub question_id: String,
    pub section: Option<String>,
    pub question_type: Option<String>,
    pub difficulty: Option<i32>,
}

impl DbQuestion {
    /// Complete metadata, or None when any required field is missing.
    pub fn to_metadata(&self) -> Option<QuestionMetadata> {
        let section = Section::from_str(self.section.as_deref()?)?;
        let difficulty = u8::try_from(self.difficulty?).ok()?;
        Some(QuestionMetadata {
            section,
            question_type: self.question_type.clone().unwrap_or_default(),
            difficulty,
        })
    }
}

// === Service Types ===

/// A wrong answer reported by the session layer.
#[derive(Debug, Clone)]
pub struct MissedAnswer {
    pub user_id: Uuid,
    pub question_id: String,
    pub response: ReviewResponse,
}

/// Result of processing one response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedResponse {
    pub item: ReviewItem,
    pub stage: MasteryStage,
    pub graduated: bool,
    pub newly_mastered: bool,
}

// === API Request/Response Types ===

#[derive(Debug, Serialize, Deserialize)]
pub struct MissedAnswerRequest {
    pub user_id: Uuid,
    pub question_id: String,
    /// Defaults to 1; must stay below 3.
    pub quality: Option<u8>,
    pub confidence: Option<Confidence>,
    pub time_spent_seconds: f64,
    pub hints_used: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl MissedAnswerRequest {
    pub fn into_missed_answer(self, now: DateTime<Utc>) -> MissedAnswer {
        MissedAnswer {
            user_id: self.user_id,
            question_id: self.question_id,
            response: ReviewResponse {
                quality: self.quality.unwrap_or(1),
                confidence: self.confidence.unwrap_or_default(),
                time_spent_seconds: self.time_spent_seconds,
                hints_used: self.hints_used.unwrap_or(0),
                timestamp: self.timestamp.unwrap_or(now),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponseRequest {
    pub quality: u8,
    pub confidence: Option<Confidence>,
    pub time_spent_seconds: f64,
    pub hints_used: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl SubmitResponseRequest {
    pub fn into_response(self, now: DateTime<Utc>) -> ReviewResponse {
        ReviewResponse {
            quality: self.quality,
            confidence: self.confidence.unwrap_or_default(),
            time_spent_seconds: self.time_spent_seconds,
            hints_used: self.hints_used.unwrap_or(0),
            timestamp: self.timestamp.unwrap_or(now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewQueueQuery {
    pub user_id: Uuid,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewQueueResponse {
    pub items: Vec<RankedItem>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RebalanceRequest {
    pub user_id: Uuid,
    pub max_daily_reviews: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RebalanceResponse {
    pub moved: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub mastered: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HintLevelResponse {
    pub item_id: Uuid,
    pub hint_level: u32,
}
