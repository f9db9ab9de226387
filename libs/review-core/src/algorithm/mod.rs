//! Retention model: decides when a review item comes back.

pub mod sm2;

use crate::types::{ReviewItem, ReviewResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use sm2::{AdaptiveSm2, IntervalAdjustment};

/// Result of scheduling an item after a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub interval_days: u32,
    pub next_review_at: DateTime<Utc>,
    pub ease_factor: f64,
    /// The item left the initial short-interval learning phase.
    pub graduated: bool,
}

/// Trait for retention models.
///
/// Implementations must be pure: identical input yields identical output.
pub trait RetentionModel: Send + Sync {
    /// Model identifier.
    fn name(&self) -> &'static str;

    /// Calculate the next schedule for an item after one response.
    fn compute_next_schedule(&self, item: &ReviewItem, response: &ReviewResponse) -> ScheduleResult;
}
