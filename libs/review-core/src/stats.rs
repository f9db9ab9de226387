//! Queue statistics for a learner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ItemStatus, ReviewItem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_items: usize,
    /// Due now and not mastered.
    pub pending_review: usize,
    pub mastered_items: usize,
    /// Mean estimated retention of the items still in rotation.
    pub average_retention: f64,
    /// Share of all scored attempts that were correct.
    pub accuracy: f64,
}

impl QueueStats {
    pub fn from_items(items: &[ReviewItem], now: DateTime<Utc>) -> Self {
        let pending_review = items.iter().filter(|i| i.is_due(now)).count();
        let mastered_items = items
            .iter()
            .filter(|i| i.status == ItemStatus::Mastered)
            .count();

        let in_rotation: Vec<f64> = items
            .iter()
            .filter(|i| i.status != ItemStatus::Mastered)
            .map(|i| estimated_retention(i, now))
            .collect();
        let average_retention = if in_rotation.is_empty() {
            0.0
        } else {
            in_rotation.iter().sum::<f64>() / in_rotation.len() as f64
        };

        let attempts: u64 = items.iter().map(|i| i.total_attempts as u64).sum();
        let incorrect: u64 = items.iter().map(|i| i.incorrect_attempts as u64).sum();
        let accuracy = if attempts == 0 {
            0.0
        } else {
            1.0 - incorrect.min(attempts) as f64 / attempts as f64
        };

        Self {
            total_items: items.len(),
            pending_review,
            mastered_items,
            average_retention,
            accuracy,
        }
    }
}

/// Forgetting-curve retention scaled by the item's current interval.
pub fn estimated_retention(item: &ReviewItem, now: DateTime<Utc>) -> f64 {
    let interval = item.interval_days.max(1) as f64;
    (-item.days_since_last_attempt(now) / interval).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::types::{QuestionMetadata, Section};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 20, 7, 0, 0).unwrap()
    }

    fn item(days_ago: i64) -> ReviewItem {
        ReviewItem::from_miss(
            Uuid::nil(),
            format!("rc-det-{days_ago:03}"),
            &QuestionMetadata {
                section: Section::Comprehension,
                question_type: "specific detail".to_string(),
                difficulty: 3,
            },
            now() - Duration::days(days_ago),
            &SchedulerConfig::default(),
        )
    }

    #[test]
    fn empty_queue() {
        let stats = QueueStats::from_items(&[], now());
        assert_eq!(
            stats,
            QueueStats {
                total_items: 0,
                pending_review: 0,
                mastered_items: 0,
                average_retention: 0.0,
                accuracy: 0.0,
            }
        );
    }

    #[test]
    fn counts_due_and_mastered() {
        let mut mastered = item(10);
        mastered.status = ItemStatus::Mastered;
        mastered.total_attempts = 8;
        let mut fresh = item(0);
        fresh.total_attempts = 2;
        let items = vec![item(3), fresh, mastered];

        let stats = QueueStats::from_items(&items, now());
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.pending_review, 1);
        assert_eq!(stats.mastered_items, 1);
        // 3 misses over 11 attempts.
        assert!((stats.accuracy - 8.0 / 11.0).abs() < 1e-9);
        assert!(stats.average_retention > 0.0 && stats.average_retention <= 1.0);
    }

    #[test]
    fn retention_decays_with_time() {
        assert!(estimated_retention(&item(0), now()) > estimated_retention(&item(4), now()));
        assert_eq!(estimated_retention(&item(0), now()), 1.0);
    }
}
