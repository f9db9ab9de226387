//! Storage contracts required by the scheduler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{MasteryTracker, QuestionMetadata, ReviewItem, Section};

/// Persistence for review items and their mastery trackers.
///
/// Writes that change scheduling state are guarded by `ReviewItem::version`:
/// a write whose expected version no longer matches fails with
/// `ApiError::ConcurrentUpdateConflict` and changes nothing.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Item and tracker by item id.
    async fn find_item(&self, item_id: Uuid) -> Result<Option<(ReviewItem, MasteryTracker)>>;

    /// Item and tracker by learner and question.
    async fn find_item_by_question(
        &self,
        user_id: Uuid,
        question_id: &str,
    ) -> Result<Option<(ReviewItem, MasteryTracker)>>;

    /// Insert a new item. Fails with a conflict if (user, question) already exists.
    async fn insert_item(&self, item: &ReviewItem, tracker: &MasteryTracker) -> Result<()>;

    /// Replace scheduling state of an item and its tracker in one write.
    ///
    /// Leaves `metadata.hint_level` untouched. Returns the new version.
    async fn save_review_state(
        &self,
        item: &ReviewItem,
        tracker: &MasteryTracker,
        expected_version: i64,
    ) -> Result<i64>;

    /// Non-mastered items with `next_review_at <= now`.
    async fn list_due_items(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<ReviewItem>>;

    /// Every item of a learner, mastered ones included.
    async fn list_user_items(&self, user_id: Uuid) -> Result<Vec<ReviewItem>>;

    /// Items whose tracker is in Master but whose status is not yet `mastered`.
    async fn list_unarchived_masters(&self) -> Result<Vec<ReviewItem>>;

    /// Set status to `mastered` if the version still matches.
    async fn mark_mastered(&self, item_id: Uuid, expected_version: i64) -> Result<()>;

    /// Move review dates; all-or-nothing across the batch.
    async fn reschedule_items(&self, moves: &[(Uuid, DateTime<Utc>, i64)]) -> Result<usize>;

    /// Cache priority scores. Does not bump versions.
    ///
    /// Unguarded: a concurrent `save_review_state` may be overwritten with the
    /// selection-time score. The score is a cache recomputed on every
    /// selection, never an input to scheduling.
    async fn update_priority_scores(&self, scores: &[(Uuid, f64)]) -> Result<()>;

    /// Atomically increment the hint level. None if the item does not exist.
    async fn increment_hint_level(&self, item_id: Uuid) -> Result<Option<u32>>;
}

/// Question bank lookup.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// None when the question or any required field is unknown.
    async fn get_question_metadata(&self, question_id: &str) -> Result<Option<QuestionMetadata>>;
}

/// Learner-level signals used for ranking.
#[async_trait]
pub trait LearnerProfile: Send + Sync {
    /// Historical accuracy (0-1) in a section and question type.
    async fn topical_accuracy(
        &self,
        user_id: Uuid,
        section: Section,
        question_type: &str,
    ) -> Result<Option<f64>>;

    async fn exam_date(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>>;
}
