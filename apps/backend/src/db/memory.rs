//! In-process repository used by tests and local runs without PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::{LearnerProfile, QuestionBank, ReviewRepository};
use crate::db::accuracy_from_counts;
use crate::error::{ApiError, Result};
use crate::models::*;

/// Same contracts as [`crate::db::Database`], kept behind one lock so batch
/// writes are all-or-nothing.
#[derive(Default)]
pub struct MemoryRepository {
    items: RwLock<HashMap<Uuid, (ReviewItem, MasteryTracker)>>,
    questions: RwLock<HashMap<String, QuestionMetadata>>,
    exam_dates: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register question metadata.
    pub async fn add_question(&self, question_id: impl Into<String>, metadata: QuestionMetadata) {
        self.questions
            .write()
            .await
            .insert(question_id.into(), metadata);
    }

    pub async fn set_exam_date(&self, user_id: Uuid, exam_date: DateTime<Utc>) {
        self.exam_dates.write().await.insert(user_id, exam_date);
    }

    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }

    fn check_version(stored: &ReviewItem, expected_version: i64) -> Result<()> {
        if stored.version != expected_version {
            return Err(ApiError::ConcurrentUpdateConflict(stored.item_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewRepository for MemoryRepository {
    async fn find_item(&self, item_id: Uuid) -> Result<Option<(ReviewItem, MasteryTracker)>> {
        Ok(self.items.read().await.get(&item_id).cloned())
    }

    async fn find_item_by_question(
        &self,
        user_id: Uuid,
        question_id: &str,
    ) -> Result<Option<(ReviewItem, MasteryTracker)>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .find(|(item, _)| item.user_id == user_id && item.question_id == question_id)
            .cloned())
    }

    async fn insert_item(&self, item: &ReviewItem, tracker: &MasteryTracker) -> Result<()> {
        let mut items = self.items.write().await;
        let duplicate = items.values().any(|(existing, _)| {
            existing.user_id == item.user_id && existing.question_id == item.question_id
        });
        if duplicate || items.contains_key(&item.item_id) {
            return Err(ApiError::ConcurrentUpdateConflict(item.item_id));
        }
        items.insert(item.item_id, (item.clone(), tracker.clone()));
        Ok(())
    }

    async fn save_review_state(
        &self,
        item: &ReviewItem,
        tracker: &MasteryTracker,
        expected_version: i64,
    ) -> Result<i64> {
        let mut items = self.items.write().await;
        let (stored, stored_tracker) = items
            .get_mut(&item.item_id)
            .ok_or(ApiError::ItemNotFound(item.item_id))?;
        Self::check_version(stored, expected_version)?;

        let hint_level = stored.metadata.hint_level;
        let version = stored.version + 1;
        *stored = ReviewItem {
            metadata: ItemMetadata { hint_level },
            version,
            ..item.clone()
        };
        *stored_tracker = tracker.clone();
        Ok(version)
    }

    async fn list_due_items(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<ReviewItem>> {
        let mut due: Vec<ReviewItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|(item, _)| item.user_id == user_id && item.is_due(now))
            .map(|(item, _)| item.clone())
            .collect();
        due.sort_by_key(|item| item.next_review_at);
        Ok(due)
    }

    async fn list_user_items(&self, user_id: Uuid) -> Result<Vec<ReviewItem>> {
        let mut items: Vec<ReviewItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|(item, _)| item.user_id == user_id)
            .map(|(item, _)| item.clone())
            .collect();
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn list_unarchived_masters(&self) -> Result<Vec<ReviewItem>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .filter(|(item, tracker)| tracker.is_master() && item.status != ItemStatus::Mastered)
            .map(|(item, _)| item.clone())
            .collect())
    }

    async fn mark_mastered(&self, item_id: Uuid, expected_version: i64) -> Result<()> {
        let mut items = self.items.write().await;
        let (stored, _) = items
            .get_mut(&item_id)
            .ok_or(ApiError::ItemNotFound(item_id))?;
        Self::check_version(stored, expected_version)?;
        stored.status = ItemStatus::Mastered;
        stored.version += 1;
        Ok(())
    }

    async fn reschedule_items(&self, moves: &[(Uuid, DateTime<Utc>, i64)]) -> Result<usize> {
        let mut items = self.items.write().await;

        // Validate the whole batch before touching anything.
        for (item_id, _, expected_version) in moves {
            let (stored, _) = items
                .get(item_id)
                .ok_or(ApiError::ItemNotFound(*item_id))?;
            Self::check_version(stored, *expected_version)?;
        }

        for (item_id, next_review_at, _) in moves {
            if let Some((stored, _)) = items.get_mut(item_id) {
                stored.next_review_at = *next_review_at;
                stored.version += 1;
            }
        }
        Ok(moves.len())
    }

    async fn update_priority_scores(&self, scores: &[(Uuid, f64)]) -> Result<()> {
        let mut items = self.items.write().await;
        for (item_id, score) in scores {
            if let Some((stored, _)) = items.get_mut(item_id) {
                stored.priority_score = *score;
            }
        }
        Ok(())
    }

    async fn increment_hint_level(&self, item_id: Uuid) -> Result<Option<u32>> {
        let mut items = self.items.write().await;
        Ok(items.get_mut(&item_id).map(|(stored, _)| {
            stored.metadata.hint_level += 1;
            stored.metadata.hint_level
        }))
    }
}

#[async_trait]
impl QuestionBank for MemoryRepository {
    async fn get_question_metadata(&self, question_id: &str) -> Result<Option<QuestionMetadata>> {
        Ok(self.questions.read().await.get(question_id).cloned())
    }
}

#[async_trait]
impl LearnerProfile for MemoryRepository {
    async fn topical_accuracy(
        &self,
        user_id: Uuid,
        section: Section,
        question_type: &str,
    ) -> Result<Option<f64>> {
        let (attempts, incorrect) = self
            .items
            .read()
            .await
            .values()
            .filter(|(item, _)| {
                item.user_id == user_id
                    && item.section == section
                    && item.question_type == question_type
            })
            .fold((0i64, 0i64), |(attempts, incorrect), (item, _)| {
                (
                    attempts + item.total_attempts as i64,
                    incorrect + item.incorrect_attempts as i64,
                )
            });
        Ok(accuracy_from_counts(attempts, incorrect))
    }

    async fn exam_date(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        Ok(self.exam_dates.read().await.get(&user_id).copied())
    }
}
