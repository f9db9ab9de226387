//! Priority ranking for due review items.
//!
//! Seven sub-scores in [0, 1] are combined with fixed weights into a single
//! urgency score. Ties are broken by recency, then difficulty, then age, then
//! item id so the ordering is total.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ReviewItem;

pub const RECENCY_WEIGHT: f64 = 0.20;
pub const FREQUENCY_WEIGHT: f64 = 0.25;
pub const DIFFICULTY_WEIGHT: f64 = 0.15;
pub const STRATEGIC_WEIGHT: f64 = 0.15;
pub const FORGETTING_WEIGHT: f64 = 0.10;
pub const WEAKNESS_WEIGHT: f64 = 0.10;
pub const URGENCY_WEIGHT: f64 = 0.05;

const NEUTRAL: f64 = 0.5;

/// Question types that show up most often on the exam.
const HIGH_VALUE_TYPES: &[&str] = &[
    "assumption",
    "strengthen",
    "weaken",
    "flaw",
    "inference",
    "must be true",
    "sequencing",
    "grouping",
];

const MEDIUM_VALUE_TYPES: &[&str] = &[
    "main point",
    "method",
    "parallel",
    "principle",
    "paradox",
    "detail",
    "purpose",
];

/// Signals from outside the item that influence ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualFactors {
    pub now: DateTime<Utc>,
    /// Learner's accuracy (0-1) in the item's section and question type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topical_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_date: Option<DateTime<Utc>>,
}

impl ContextualFactors {
    /// Context with no learner or deadline signals.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            topical_accuracy: None,
            exam_date: None,
        }
    }
}

/// Normalized sub-scores behind a priority score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityFactors {
    pub recency: f64,
    pub frequency: f64,
    pub difficulty: f64,
    pub strategic: f64,
    pub forgetting: f64,
    pub weakness: f64,
    pub urgency: f64,
}

impl PriorityFactors {
    pub fn weighted_sum(&self) -> f64 {
        self.recency * RECENCY_WEIGHT
            + self.frequency * FREQUENCY_WEIGHT
            + self.difficulty * DIFFICULTY_WEIGHT
            + self.strategic * STRATEGIC_WEIGHT
            + self.forgetting * FORGETTING_WEIGHT
            + self.weakness * WEAKNESS_WEIGHT
            + self.urgency * URGENCY_WEIGHT
    }

    fn labelled(&self) -> [(f64, &'static str); 7] {
        [
            (self.recency, "missed recently"),
            (self.frequency, "missed repeatedly"),
            (self.difficulty, "high difficulty"),
            (self.strategic, "high-value question type"),
            (self.forgetting, "likely forgotten"),
            (self.weakness, "weak topic"),
            (self.urgency, "exam approaching"),
        ]
    }
}

/// Priority score with its breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRanking {
    pub score: f64,
    pub factors: PriorityFactors,
    /// Human-readable notes; never used for ordering.
    pub explanation: Vec<String>,
}

/// Compute the urgency score of an item.
pub fn rank_priority(
    item: &ReviewItem,
    context: &ContextualFactors,
    notable_threshold: f64,
) -> PriorityRanking {
    let factors = PriorityFactors {
        recency: recency_score(item.days_since_last_miss(context.now)),
        frequency: (item.incorrect_attempts as f64 / 5.0).min(1.0),
        difficulty: (item.difficulty as f64 / 10.0).clamp(0.0, 1.0),
        strategic: strategic_importance(&item.question_type),
        forgetting: forgetting_score(item.days_since_last_attempt(context.now)),
        weakness: context
            .topical_accuracy
            .map(|accuracy| 1.0 - accuracy.clamp(0.0, 1.0))
            .unwrap_or(NEUTRAL),
        urgency: urgency_score(context.now, context.exam_date),
    };

    let explanation = factors
        .labelled()
        .iter()
        .filter(|(value, _)| *value > notable_threshold)
        .map(|(_, label)| label.to_string())
        .collect();

    PriorityRanking {
        score: factors.weighted_sum().clamp(0.0, 1.0),
        factors,
        explanation,
    }
}

/// 1.0 for a miss within the last day, decaying to 0 over a week.
pub fn recency_score(days_since_miss: f64) -> f64 {
    if days_since_miss <= 1.0 {
        1.0
    } else if days_since_miss <= 7.0 {
        (-(days_since_miss - 1.0) / 2.0).exp()
    } else {
        0.0
    }
}

/// Share of retention lost on a 7-day forgetting curve.
pub fn forgetting_score(days_since_attempt: f64) -> f64 {
    1.0 - (-days_since_attempt.max(0.0) / 7.0).exp()
}

/// Exam-frequency tier of a question type.
pub fn strategic_importance(question_type: &str) -> f64 {
    let normalized = question_type.to_lowercase().replace(['_', '-'], " ");
    if HIGH_VALUE_TYPES.iter().any(|t| normalized.contains(t)) {
        0.8
    } else if MEDIUM_VALUE_TYPES.iter().any(|t| normalized.contains(t)) {
        0.6
    } else {
        0.4
    }
}

/// Deadline pressure from an upcoming exam.
pub fn urgency_score(now: DateTime<Utc>, exam_date: Option<DateTime<Utc>>) -> f64 {
    let Some(exam_date) = exam_date else {
        return NEUTRAL;
    };
    if exam_date < now {
        return NEUTRAL;
    }
    let days = exam_date.signed_duration_since(now).num_days();
    match days {
        0..=7 => 1.0,
        8..=30 => 0.8,
        31..=90 => 0.6,
        _ => 0.4,
    }
}

/// An item paired with its ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub item: ReviewItem,
    pub ranking: PriorityRanking,
}

impl RankedItem {
    pub fn new(item: ReviewItem, context: &ContextualFactors, notable_threshold: f64) -> Self {
        let ranking = rank_priority(&item, context, notable_threshold);
        Self { item, ranking }
    }
}

/// Most urgent first.
pub fn compare_ranked(a: &RankedItem, b: &RankedItem) -> Ordering {
    b.ranking
        .score
        .total_cmp(&a.ranking.score)
        .then_with(|| b.ranking.factors.recency.total_cmp(&a.ranking.factors.recency))
        .then_with(|| b.item.difficulty.cmp(&a.item.difficulty))
        .then_with(|| a.item.created_at.cmp(&b.item.created_at))
        .then_with(|| a.item.item_id.cmp(&b.item.item_id))
}

/// Sort in place, most urgent first.
pub fn sort_ranked(items: &mut [RankedItem]) {
    items.sort_by(compare_ranked);
}
