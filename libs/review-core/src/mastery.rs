//! Mastery state machine.
//!
//! `Learning -> Young -> Mature -> Master`, with any miss dropping a
//! non-master item back to Learning. The mastery level follows an
//! exponential moving average of per-response performance and is kept as a
//! whole-number percentage.

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::types::{Confidence, MasteryStage, MasteryTracker, ReviewItem, ReviewResponse};

const YOUNG_LEVEL: f64 = 40.0;
const MATURE_LEVEL: f64 = 70.0;

/// Outcome of feeding one response through the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryUpdate {
    pub tracker: MasteryTracker,
    pub performance_score: f64,
    pub previous_stage: MasteryStage,
    /// Set only on the update that first reaches Master.
    pub newly_mastered: bool,
}

#[derive(Debug, Clone)]
pub struct MasteryStateMachine {
    pub alpha: f64,
}

impl Default for MasteryStateMachine {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl MasteryStateMachine {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            alpha: config.mastery_alpha,
        }
    }

    /// Score in [0, 1] for a single response.
    ///
    /// A quality-5 answer always scores 1.0; timing and confidence only
    /// adjust lesser correct answers.
    pub fn performance_score(&self, item: &ReviewItem, response: &ReviewResponse) -> f64 {
        let score = if response.quality >= 5 {
            1.0
        } else if response.is_correct() {
            let expected = item.section.expected_seconds(item.difficulty);
            let ratio = response.time_spent_seconds / expected;
            let timing = if (0.8..=1.2).contains(&ratio) {
                0.1
            } else if ratio > 2.0 {
                -0.1
            } else {
                0.0
            };
            let confidence = match response.confidence {
                Confidence::High => 0.05,
                Confidence::Medium => 0.0,
                Confidence::Low => -0.05,
            };
            0.7 + 0.1 * (response.quality as f64 - 3.0) + timing + confidence
        } else {
            // Confident misses score lowest.
            let confidence = match response.confidence {
                Confidence::High => -0.05,
                _ => 0.0,
            };
            0.05 * response.quality as f64 + confidence
        };
        score.clamp(0.0, 1.0)
    }

    /// Advance the tracker by one response.
    pub fn apply(
        &self,
        tracker: &MasteryTracker,
        item: &ReviewItem,
        response: &ReviewResponse,
    ) -> MasteryUpdate {
        let performance_score = self.performance_score(item, response);
        let level = tracker.current_level
            + self.alpha * (performance_score * 100.0 - tracker.current_level);

        let mut next = tracker.clone();
        next.current_level = level.round().clamp(0.0, 100.0);
        next.consecutive_correct = if response.is_correct() {
            tracker.consecutive_correct + 1
        } else {
            0
        };
        next.attempt_count = tracker.attempt_count + 1;

        let mut newly_mastered = false;
        if tracker.is_master() {
            // Terminal: never regress, never re-fire.
            next.stage = MasteryStage::Master;
        } else if meets_master_criteria(&next) {
            next.stage = MasteryStage::Master;
            next.mastery_achieved_at = Some(response.timestamp);
            newly_mastered = true;
        } else {
            next.stage = stage_for(next.current_level, next.consecutive_correct);
        }

        MasteryUpdate {
            tracker: next,
            performance_score,
            previous_stage: tracker.stage,
            newly_mastered,
        }
    }
}

/// Non-terminal stage for a level and streak.
///
/// Levels at or above the target stay Mature until the streak and attempt
/// count also qualify.
pub fn stage_for(level: f64, consecutive_correct: u32) -> MasteryStage {
    if level < YOUNG_LEVEL || consecutive_correct == 0 {
        MasteryStage::Learning
    } else if level < MATURE_LEVEL {
        MasteryStage::Young
    } else {
        MasteryStage::Mature
    }
}

/// Whether the tracker satisfies every Master condition.
pub fn meets_master_criteria(tracker: &MasteryTracker) -> bool {
    tracker.current_level >= tracker.target_level
        && tracker.consecutive_correct >= tracker.required_consecutive
        && tracker.attempt_count >= tracker.minimum_attempts
}

/// Clear Master so a newly missed item re-enters the cycle.
pub fn reopen(tracker: &MasteryTracker) -> MasteryTracker {
    MasteryTracker {
        consecutive_correct: 0,
        stage: MasteryStage::Learning,
        mastery_achieved_at: None,
        ..tracker.clone()
    }
}
