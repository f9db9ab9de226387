//! Adaptive SM-2 retention model.
//!
//! Classic SuperMemo 2 interval growth, with the interval of each correct
//! response scaled by a multiplier built from item difficulty, response time,
//! confidence, hint usage and the item's history.

use super::{RetentionModel, ScheduleResult};
use crate::config::SchedulerConfig;
use crate::types::{Confidence, ReviewItem, ReviewResponse};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Adaptive SM-2 with configurable bounds.
#[derive(Debug, Clone)]
pub struct AdaptiveSm2 {
    pub min_interval_days: u32,
    pub max_interval_days: u32,
    pub minimum_ease: f64,
}

impl Default for AdaptiveSm2 {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

/// Individual interval multipliers, each already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalAdjustment {
    pub difficulty: f64,
    pub time: f64,
    pub confidence: f64,
    pub hints: f64,
    pub history: f64,
    /// Product of the factors, clamped to [0.3, 2.0].
    pub combined: f64,
}

impl RetentionModel for AdaptiveSm2 {
    fn name(&self) -> &'static str {
        "adaptive_sm2"
    }

    fn compute_next_schedule(&self, item: &ReviewItem, response: &ReviewResponse) -> ScheduleResult {
        let repetitions = repetitions_from_mastery(item.mastery_level);
        let correct = response.is_correct();

        let (interval, repetitions, ease_factor) = if correct {
            let base = match repetitions {
                0 => 1.0,
                1 => 6.0,
                _ => (item.interval_days as f64 * item.ease_factor).round(),
            };
            let adjusted = (base * self.adjustment(item, response).combined).round();
            (
                adjusted,
                repetitions + 1,
                self.next_ease(item.ease_factor, response.quality),
            )
        } else {
            (1.0, 0, item.ease_factor)
        };

        let interval_days = (interval.max(0.0) as u32)
            .clamp(self.min_interval_days, self.max_interval_days);

        // Out-of-order submissions must not schedule before the last attempt.
        let now = response.timestamp.max(item.last_attempted_at);

        ScheduleResult {
            interval_days,
            next_review_at: now + Duration::days(interval_days as i64),
            ease_factor,
            graduated: correct && repetitions >= 2,
        }
    }
}

impl AdaptiveSm2 {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            min_interval_days: config.min_interval_days,
            max_interval_days: config.max_interval_days,
            minimum_ease: config.minimum_ease,
        }
    }

    /// SM-2 ease update. Only applied to correct responses.
    pub fn next_ease(&self, ease_factor: f64, quality: u8) -> f64 {
        let miss = 5.0 - quality.min(5) as f64;
        let delta = 0.1 - miss * (0.08 + miss * 0.02);
        (ease_factor + delta).max(self.minimum_ease)
    }

    /// Continuous interval multiplier for a correct response.
    pub fn adjustment(&self, item: &ReviewItem, response: &ReviewResponse) -> IntervalAdjustment {
        let difficulty = (1.0 - (item.difficulty as f64 - 5.0) * 0.05).clamp(0.75, 1.25);

        let expected = item.section.expected_seconds(item.difficulty);
        let ratio = response.time_spent_seconds / expected;
        let time = if ratio < 0.5 {
            // Likely guessed.
            0.9
        } else if ratio > 2.0 {
            0.8
        } else if (0.8..=1.2).contains(&ratio) {
            1.1
        } else {
            1.0
        };

        let confidence = match response.confidence {
            Confidence::Low => 0.85,
            Confidence::Medium => 1.0,
            Confidence::High => 1.15,
        };

        let hints = (1.0 - response.hints_used as f64 * 0.1).max(0.5);

        let error_rate = item.incorrect_attempts as f64 / item.total_attempts.max(1) as f64;
        let mastery_weight = 0.8 + 0.4 * (item.mastery_level / 100.0);
        let history = (mastery_weight * (1.0 - 0.3 * error_rate.min(1.0))).clamp(0.7, 1.3);

        let combined = (difficulty * time * confidence * hints * history).clamp(0.3, 2.0);

        IntervalAdjustment {
            difficulty,
            time,
            confidence,
            hints,
            history,
            combined,
        }
    }
}

/// Repetition count implied by the mastery level.
pub fn repetitions_from_mastery(mastery_level: f64) -> u32 {
    if mastery_level >= 80.0 {
        3
    } else if mastery_level >= 60.0 {
        2
    } else if mastery_level >= 40.0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemMetadata, ItemStatus, Section};
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap()
    }

    /// Item whose history factor is exactly 1.0.
    fn item(mastery_level: f64, interval_days: u32) -> ReviewItem {
        let at = now() - Duration::days(interval_days as i64);
        ReviewItem {
            item_id: Uuid::nil(),
            question_id: "lr-str-004".to_string(),
            user_id: Uuid::nil(),
            section: Section::Reasoning,
            question_type: "strengthen".to_string(),
            difficulty: 5,
            interval_days,
            ease_factor: 2.5,
            next_review_at: now(),
            mastery_level,
            incorrect_attempts: 0,
            total_attempts: 4,
            consecutive_correct: 1,
            last_attempted_at: at,
            last_missed_at: at,
            created_at: at,
            priority_score: 0.0,
            status: ItemStatus::Active,
            metadata: ItemMetadata::default(),
            version: 1,
        }
    }

    /// Response whose time, confidence and hint factors are all 1.0.
    fn response(quality: u8) -> ReviewResponse {
        ReviewResponse {
            quality,
            confidence: Confidence::Medium,
            time_spent_seconds: 135.0,
            hints_used: 0,
            timestamp: now(),
        }
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let sm2 = AdaptiveSm2::default();
        let item = item(65.0, 10);
        let response = response(4);
        assert_eq!(
            sm2.compute_next_schedule(&item, &response),
            sm2.compute_next_schedule(&item, &response)
        );
    }

    #[test]
    fn failure_always_yields_floor_interval() {
        let sm2 = AdaptiveSm2::default();
        for mastery in [0.0, 45.0, 70.0, 99.0] {
            for quality in 0..3 {
                let mut r = response(quality);
                r.confidence = Confidence::High;
                r.time_spent_seconds = 90.0;
                let result = sm2.compute_next_schedule(&item(mastery, 120), &r);
                assert_eq!(result.interval_days, 1);
                assert_eq!(result.next_review_at, now() + Duration::days(1));
                assert!(!result.graduated);
            }
        }
    }

    #[test]
    fn failure_leaves_ease_untouched() {
        let sm2 = AdaptiveSm2::default();
        let result = sm2.compute_next_schedule(&item(50.0, 6), &response(1));
        assert_eq!(result.ease_factor, 2.5);
    }

    #[test]
    fn first_correct_response_gets_one_day() {
        let sm2 = AdaptiveSm2::default();
        let result = sm2.compute_next_schedule(&item(10.0, 1), &response(4));
        assert_eq!(result.interval_days, 1);
        assert!(!result.graduated);
    }

    #[test]
    fn second_repetition_gets_six_days_and_graduates() {
        let sm2 = AdaptiveSm2::default();
        let result = sm2.compute_next_schedule(&item(50.0, 1), &response(4));
        assert_eq!(result.interval_days, 6);
        assert!(result.graduated);
    }

    #[test]
    fn later_repetitions_grow_with_ease() {
        let sm2 = AdaptiveSm2::default();
        let result = sm2.compute_next_schedule(&item(85.0, 10), &response(4));
        assert!(result.interval_days > 20);
        assert!(result.graduated);
    }

    #[test]
    fn interval_is_capped_at_maximum() {
        let sm2 = AdaptiveSm2::default();
        let result = sm2.compute_next_schedule(&item(95.0, 300), &response(5));
        assert_eq!(result.interval_days, 365);
    }

    #[test]
    fn perfect_responses_never_lower_ease() {
        let sm2 = AdaptiveSm2::default();
        let mut current = item(85.0, 6);
        for _ in 0..8 {
            let result = sm2.compute_next_schedule(&current, &response(5));
            assert!(result.ease_factor >= current.ease_factor);
            current.ease_factor = result.ease_factor;
            current.interval_days = result.interval_days;
        }
    }

    #[test]
    fn ease_update_matches_sm2_formula() {
        let sm2 = AdaptiveSm2::default();
        assert!((sm2.next_ease(2.5, 5) - 2.6).abs() < 1e-9);
        assert!((sm2.next_ease(2.5, 4) - 2.5).abs() < 1e-9);
        assert!((sm2.next_ease(2.5, 3) - 2.36).abs() < 1e-9);
        assert_eq!(sm2.next_ease(1.35, 3), 1.3);
    }

    #[test]
    fn neutral_signals_give_unit_multiplier() {
        let sm2 = AdaptiveSm2::default();
        let adjustment = sm2.adjustment(&item(50.0, 6), &response(4));
        assert_eq!(adjustment.time, 1.0);
        assert_eq!(adjustment.confidence, 1.0);
        assert_eq!(adjustment.hints, 1.0);
        assert!((adjustment.combined - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hard_slow_hinted_response_shortens_interval() {
        let sm2 = AdaptiveSm2::default();
        let mut hard = item(50.0, 6);
        hard.difficulty = 9;
        let mut r = response(3);
        r.time_spent_seconds = 400.0;
        r.confidence = Confidence::Low;
        r.hints_used = 7;

        let adjustment = sm2.adjustment(&hard, &r);
        assert_eq!(adjustment.time, 0.8);
        assert_eq!(adjustment.hints, 0.5);
        assert!(adjustment.combined < 0.5);
        assert!(adjustment.combined >= 0.3);
    }

    #[test]
    fn efficient_confident_response_lengthens_interval() {
        let sm2 = AdaptiveSm2::default();
        let mut r = response(5);
        r.time_spent_seconds = 90.0;
        r.confidence = Confidence::High;
        let adjustment = sm2.adjustment(&item(50.0, 6), &r);
        assert_eq!(adjustment.time, 1.1);
        assert!(adjustment.combined > 1.2);
    }

    #[test]
    fn errors_in_history_shorten_interval() {
        let sm2 = AdaptiveSm2::default();
        let mut shaky = item(50.0, 6);
        shaky.incorrect_attempts = 4;
        let adjustment = sm2.adjustment(&shaky, &response(4));
        assert!((adjustment.history - 0.7).abs() < 1e-9);
    }

    #[test]
    fn stale_timestamp_never_schedules_before_last_attempt() {
        let sm2 = AdaptiveSm2::default();
        let current = item(50.0, 6);
        let mut r = response(1);
        r.timestamp = current.last_attempted_at - Duration::days(3);
        let result = sm2.compute_next_schedule(&current, &r);
        assert!(result.next_review_at >= current.last_attempted_at);
    }

    #[test]
    fn repetitions_follow_mastery_thresholds() {
        assert_eq!(repetitions_from_mastery(0.0), 0);
        assert_eq!(repetitions_from_mastery(39.9), 0);
        assert_eq!(repetitions_from_mastery(40.0), 1);
        assert_eq!(repetitions_from_mastery(60.0), 2);
        assert_eq!(repetitions_from_mastery(80.0), 3);
    }
}
