//! Daily workload balancing.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::error::{Result, ValidationError};
use crate::types::ReviewItem;

/// Spread items so that no calendar day (UTC) holds more than
/// `max_daily_reviews` of them.
///
/// Items are walked in `next_review_at` order; an item landing on a full day
/// moves forward one day at a time until it fits. Items only ever move later,
/// so the day order of any two items is preserved.
pub fn optimize_schedule(
    mut items: Vec<ReviewItem>,
    max_daily_reviews: usize,
) -> Result<Vec<ReviewItem>> {
    if max_daily_reviews == 0 {
        return Err(ValidationError::ZeroDailyCap);
    }

    items.sort_by(|a, b| {
        a.next_review_at
            .cmp(&b.next_review_at)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });

    let mut load: HashMap<NaiveDate, usize> = HashMap::new();
    // First day that may still have room, per original day.
    let mut next_open: HashMap<NaiveDate, NaiveDate> = HashMap::new();

    for item in items.iter_mut() {
        let original = item.next_review_at.date_naive();
        let mut day = next_open.get(&original).copied().unwrap_or(original).max(original);

        while load.get(&day).copied().unwrap_or(0) >= max_daily_reviews {
            day = day + Duration::days(1);
        }

        let shift = (day - original).num_days();
        if shift > 0 {
            item.next_review_at += Duration::days(shift);
        }
        *load.entry(day).or_insert(0) += 1;
        next_open.insert(original, day);
    }

    Ok(items)
}

/// Number of items per calendar day.
pub fn daily_load(items: &[ReviewItem]) -> HashMap<NaiveDate, usize> {
    let mut load = HashMap::new();
    for item in items {
        *load.entry(item.next_review_at.date_naive()).or_insert(0) += 1;
    }
    load
}
