//! Core types for the review scheduler.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{Result, ValidationError};

/// Exam section a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Reasoning,
    Comprehension,
    Games,
}

impl Section {
    /// Get the section name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Comprehension => "comprehension",
            Self::Games => "games",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "reasoning" => Some(Self::Reasoning),
            "comprehension" => Some(Self::Comprehension),
            "games" => Some(Self::Games),
            _ => None,
        }
    }

    /// Expected seconds to answer a question of this section at the given difficulty.
    pub fn expected_seconds(&self, difficulty: u8) -> f64 {
        let base = match self {
            Self::Reasoning => 90.0,
            Self::Comprehension => 120.0,
            Self::Games => 150.0,
        };
        let scale = 1.0 + (difficulty as f64 - 5.0) * 0.1;
        base * scale.max(0.5)
    }
}

/// Self-reported confidence for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Default for Confidence {
    fn default() -> Self {
        Self::Medium
    }
}

/// Lifecycle status of a review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Created from a miss, not reviewed yet.
    Pending,
    Active,
    /// Retired from scheduling. History is kept.
    Mastered,
}

impl Default for ItemStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Mastered => "mastered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "mastered" => Some(Self::Mastered),
            _ => None,
        }
    }
}

/// Stage of the mastery state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryStage {
    Learning,
    Young,
    Mature,
    Master,
}

impl Default for MasteryStage {
    fn default() -> Self {
        Self::Learning
    }
}

impl MasteryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learning => "learning",
            Self::Young => "young",
            Self::Mature => "mature",
            Self::Master => "master",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "learning" => Some(Self::Learning),
            "young" => Some(Self::Young),
            "mature" => Some(Self::Mature),
            "master" => Some(Self::Master),
            _ => None,
        }
    }
}

/// Metadata supplied by the question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionMetadata {
    pub section: Section,
    pub question_type: String,
    pub difficulty: u8,
}

impl QuestionMetadata {
    /// Check the difficulty is on the 1-10 scale.
    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.difficulty) {
            return Err(ValidationError::DifficultyOutOfRange(self.difficulty));
        }
        Ok(())
    }
}

/// Auxiliary per-item fields owned by other subsystems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Written by the hint system, never read by the scheduler.
    pub hint_level: u32,
}

/// A single submission for a review item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResponse {
    /// 0-5, where 3 and above counts as correct.
    pub quality: u8,
    #[serde(default)]
    pub confidence: Confidence,
    pub time_spent_seconds: f64,
    #[serde(default)]
    pub hints_used: u32,
    pub timestamp: DateTime<Utc>,
}

impl ReviewResponse {
    pub fn is_correct(&self) -> bool {
        self.quality >= 3
    }

    /// Reject out-of-range input before it reaches any scheduling state.
    pub fn validate(&self) -> Result<()> {
        if self.quality > 5 {
            return Err(ValidationError::QualityOutOfRange(self.quality));
        }
        if self.time_spent_seconds < 0.0 || self.time_spent_seconds.is_nan() {
            return Err(ValidationError::NegativeTimeSpent(self.time_spent_seconds));
        }
        Ok(())
    }
}

/// One learner's relationship to one practice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub item_id: Uuid,
    pub question_id: String,
    pub user_id: Uuid,
    pub section: Section,
    pub question_type: String,
    pub difficulty: u8,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub mastery_level: f64,
    pub incorrect_attempts: u32,
    pub total_attempts: u32,
    pub consecutive_correct: u32,
    pub last_attempted_at: DateTime<Utc>,
    pub last_missed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Cached from the last selection pass.
    pub priority_score: f64,
    pub status: ItemStatus,
    #[serde(default)]
    pub metadata: ItemMetadata,
    pub version: i64,
}

impl ReviewItem {
    /// Create the item for a question answered incorrectly for the first time.
    pub fn from_miss(
        user_id: Uuid,
        question_id: impl Into<String>,
        question: &QuestionMetadata,
        missed_at: DateTime<Utc>,
        config: &SchedulerConfig,
    ) -> Self {
        let interval_days = config.min_interval_days;
        Self {
            item_id: Uuid::new_v4(),
            question_id: question_id.into(),
            user_id,
            section: question.section,
            question_type: question.question_type.clone(),
            difficulty: question.difficulty,
            interval_days,
            ease_factor: config.initial_ease,
            next_review_at: missed_at + Duration::days(interval_days as i64),
            mastery_level: 0.0,
            incorrect_attempts: 1,
            total_attempts: 1,
            consecutive_correct: 0,
            last_attempted_at: missed_at,
            last_missed_at: missed_at,
            created_at: missed_at,
            priority_score: 0.0,
            status: ItemStatus::Pending,
            metadata: ItemMetadata::default(),
            version: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status != ItemStatus::Mastered && self.next_review_at <= now
    }

    pub fn days_since_last_attempt(&self, now: DateTime<Utc>) -> f64 {
        elapsed_days(self.last_attempted_at, now)
    }

    pub fn days_since_last_miss(&self, now: DateTime<Utc>) -> f64 {
        elapsed_days(self.last_missed_at, now)
    }
}

/// State-machine trajectory for one review item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryTracker {
    pub item_id: Uuid,
    pub current_level: f64,
    pub target_level: f64,
    pub consecutive_correct: u32,
    pub required_consecutive: u32,
    pub attempt_count: u32,
    pub minimum_attempts: u32,
    pub stage: MasteryStage,
    pub mastery_achieved_at: Option<DateTime<Utc>>,
}

impl MasteryTracker {
    /// Tracker for a freshly created item. The initial miss counts as an attempt.
    pub fn new(item_id: Uuid, config: &SchedulerConfig) -> Self {
        Self {
            item_id,
            current_level: 0.0,
            target_level: config.target_level,
            consecutive_correct: 0,
            required_consecutive: config.required_consecutive,
            attempt_count: 1,
            minimum_attempts: config.minimum_attempts,
            stage: MasteryStage::Learning,
            mastery_achieved_at: None,
        }
    }

    pub fn is_master(&self) -> bool {
        self.stage == MasteryStage::Master
    }
}

/// Fractional days from `from` to `to`, never negative.
pub fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to.signed_duration_since(from).num_seconds() as f64 / 86_400.0).max(0.0)
}
