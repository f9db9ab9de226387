//! Review queue orchestration.
//!
//! The [`Scheduler`] ties the pure scheduling pieces of `review-core` to
//! storage. Every read-modify-write on an item is guarded by the item's
//! version; a stale write fails with `ConcurrentUpdateConflict` and is never
//! retried here.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use review_core::mastery::{self, MasteryUpdate};
use review_core::priority::sort_ranked;
use review_core::{
    optimize_schedule, rank_priority, AdaptiveSm2, ContextualFactors, MasteryStateMachine,
    RetentionModel, ScheduleResult, SchedulerConfig, ValidationError,
};
use uuid::Uuid;

use crate::db::{LearnerProfile, QuestionBank, ReviewRepository};
use crate::error::{ApiError, Result};
use crate::models::*;

const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Scheduler {
    repository: Arc<dyn ReviewRepository>,
    questions: Arc<dyn QuestionBank>,
    learners: Arc<dyn LearnerProfile>,
    config: SchedulerConfig,
    retention: Box<dyn RetentionModel>,
    mastery: MasteryStateMachine,
    storage_timeout: Duration,
}

impl Scheduler {
    /// Build a scheduler over explicit collaborators.
    pub fn new(
        repository: Arc<dyn ReviewRepository>,
        questions: Arc<dyn QuestionBank>,
        learners: Arc<dyn LearnerProfile>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            repository,
            questions,
            learners,
            retention: Box::new(AdaptiveSm2::from_config(&config)),
            mastery: MasteryStateMachine::from_config(&config),
            config,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        })
    }

    /// Build a scheduler over one store that plays every collaborator role.
    pub fn from_store<S>(store: Arc<S>, config: SchedulerConfig) -> Result<Self>
    where
        S: ReviewRepository + QuestionBank + LearnerProfile + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    pub fn with_storage_timeout(mut self, storage_timeout: Duration) -> Self {
        self.storage_timeout = storage_timeout;
        self
    }

    /// Ingest a wrong answer.
    ///
    /// Creates the item on the first miss for a (user, question) pair. A later
    /// miss goes through the same path as a scored response, reopening the
    /// item first if it had been mastered.
    pub async fn record_miss(&self, miss: MissedAnswer) -> Result<ReviewItem> {
        let MissedAnswer {
            user_id,
            question_id,
            response,
        } = miss;

        response.validate()?;
        if response.is_correct() {
            return Err(ValidationError::NotAMiss(response.quality).into());
        }

        let existing = self
            .bounded(
                "find_item_by_question",
                self.repository.find_item_by_question(user_id, &question_id),
            )
            .await?;

        match existing {
            Some((item, tracker)) => self.record_repeat_miss(item, tracker, &response).await,
            None => self.create_item(user_id, &question_id, &response).await,
        }
    }

    async fn create_item(
        &self,
        user_id: Uuid,
        question_id: &str,
        response: &ReviewResponse,
    ) -> Result<ReviewItem> {
        let metadata = self
            .bounded(
                "get_question_metadata",
                self.questions.get_question_metadata(question_id),
            )
            .await?
            .ok_or_else(|| {
                ApiError::MissingMetadata(format!("no section or difficulty for {question_id}"))
            })?;
        metadata.validate().map_err(|e| {
            ApiError::MissingMetadata(format!("unusable metadata for {question_id}: {e}"))
        })?;

        let mut item =
            ReviewItem::from_miss(user_id, question_id, &metadata, response.timestamp, &self.config);
        let tracker = MasteryTracker::new(item.item_id, &self.config);

        let context = self.context_for(&item, response.timestamp).await?;
        item.priority_score = rank_priority(&item, &context, self.config.notable_threshold).score;

        self.bounded("insert_item", self.repository.insert_item(&item, &tracker))
            .await?;

        tracing::info!(
            item_id = %item.item_id,
            user_id = %user_id,
            question_id,
            next_review_at = %item.next_review_at,
            "created review item"
        );
        Ok(item)
    }

    async fn record_repeat_miss(
        &self,
        item: ReviewItem,
        tracker: MasteryTracker,
        response: &ReviewResponse,
    ) -> Result<ReviewItem> {
        let tracker = if tracker.is_master() {
            tracing::info!(item_id = %item.item_id, "reopening mastered item after a new miss");
            mastery::reopen(&tracker)
        } else {
            tracker
        };

        let context = self.context_for(&item, response.timestamp).await?;
        let (mut updated, mastery_update, _) =
            self.apply_response(&item, &tracker, response, &context);

        let version = self
            .bounded(
                "save_review_state",
                self.repository
                    .save_review_state(&updated, &mastery_update.tracker, item.version),
            )
            .await?;
        updated.version = version;

        tracing::info!(
            item_id = %updated.item_id,
            incorrect_attempts = updated.incorrect_attempts,
            next_review_at = %updated.next_review_at,
            "recorded repeat miss"
        );
        Ok(updated)
    }

    /// Due items for a learner, most urgent first.
    pub async fn get_items_for_review(&self, user_id: Uuid, limit: usize) -> Result<Vec<RankedItem>> {
        self.rank_due_items(user_id, limit, Utc::now()).await
    }

    /// Same as [`Self::get_items_for_review`] with an explicit clock.
    pub async fn rank_due_items(
        &self,
        user_id: Uuid,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<RankedItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let due = self
            .bounded("list_due_items", self.repository.list_due_items(user_id, now))
            .await?;
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let exam_date = self
            .bounded("exam_date", self.learners.exam_date(user_id))
            .await?;

        let mut accuracy: HashMap<(Section, String), Option<f64>> = HashMap::new();
        let mut ranked = Vec::with_capacity(due.len());
        for item in due {
            let key = (item.section, item.question_type.clone());
            let topical_accuracy = match accuracy.get(&key).copied() {
                Some(cached) => cached,
                None => {
                    let value = self
                        .bounded(
                            "topical_accuracy",
                            self.learners
                                .topical_accuracy(user_id, item.section, &item.question_type),
                        )
                        .await?;
                    accuracy.insert(key, value);
                    value
                }
            };
            let context = ContextualFactors {
                now,
                topical_accuracy,
                exam_date,
            };
            ranked.push(RankedItem::new(item, &context, self.config.notable_threshold));
        }

        sort_ranked(&mut ranked);
        ranked.truncate(limit);

        let scores: Vec<(Uuid, f64)> = ranked
            .iter_mut()
            .map(|r| {
                r.item.priority_score = r.ranking.score;
                (r.item.item_id, r.ranking.score)
            })
            .collect();
        self.bounded(
            "update_priority_scores",
            self.repository.update_priority_scores(&scores),
        )
        .await?;

        tracing::debug!(user_id = %user_id, selected = ranked.len(), "selected review items");
        Ok(ranked)
    }

    /// Score one response and persist the resulting item state.
    pub async fn process_response(
        &self,
        item_id: Uuid,
        response: ReviewResponse,
    ) -> Result<ProcessedResponse> {
        response.validate()?;

        let (item, tracker) = self
            .bounded("find_item", self.repository.find_item(item_id))
            .await?
            .ok_or(ApiError::ItemNotFound(item_id))?;

        let context = self.context_for(&item, response.timestamp).await?;
        let (mut updated, mastery_update, schedule) =
            self.apply_response(&item, &tracker, &response, &context);

        let version = self
            .bounded(
                "save_review_state",
                self.repository
                    .save_review_state(&updated, &mastery_update.tracker, item.version),
            )
            .await
            .inspect_err(|e| {
                if matches!(e, ApiError::ConcurrentUpdateConflict(_)) {
                    tracing::warn!(item_id = %item_id, expected_version = item.version, "stale response rejected");
                }
            })?;
        updated.version = version;

        if mastery_update.newly_mastered {
            tracing::info!(item_id = %item_id, level = updated.mastery_level, "item mastered");
        }
        tracing::info!(
            item_id = %item_id,
            model = self.retention.name(),
            quality = response.quality,
            interval_days = updated.interval_days,
            stage = mastery_update.tracker.stage.as_str(),
            "processed response"
        );

        Ok(ProcessedResponse {
            stage: mastery_update.tracker.stage,
            graduated: schedule.graduated,
            newly_mastered: mastery_update.newly_mastered,
            item: updated,
        })
    }

    /// Spread a learner's upcoming reviews under a daily cap.
    ///
    /// Returns how many items moved.
    pub async fn rebalance_user(
        &self,
        user_id: Uuid,
        max_daily_reviews: Option<usize>,
    ) -> Result<usize> {
        let cap = max_daily_reviews.unwrap_or(self.config.max_daily_reviews);

        let items: Vec<ReviewItem> = self
            .bounded("list_user_items", self.repository.list_user_items(user_id))
            .await?
            .into_iter()
            .filter(|item| item.status != ItemStatus::Mastered)
            .collect();

        let before: HashMap<Uuid, DateTime<Utc>> = items
            .iter()
            .map(|item| (item.item_id, item.next_review_at))
            .collect();

        let moves: Vec<(Uuid, DateTime<Utc>, i64)> = optimize_schedule(items, cap)?
            .into_iter()
            .filter(|item| before.get(&item.item_id) != Some(&item.next_review_at))
            .map(|item| (item.item_id, item.next_review_at, item.version))
            .collect();

        if moves.is_empty() {
            return Ok(0);
        }

        let moved = self
            .bounded("reschedule_items", self.repository.reschedule_items(&moves))
            .await?;
        tracing::info!(user_id = %user_id, moved, cap, "rebalanced review schedule");
        Ok(moved)
    }

    /// Mark items whose tracker reached Master as `mastered`.
    ///
    /// Items that changed since they were listed are left for the next sweep.
    pub async fn cleanup_mastered(&self) -> Result<usize> {
        let candidates = self
            .bounded(
                "list_unarchived_masters",
                self.repository.list_unarchived_masters(),
            )
            .await?;

        let mut archived = 0;
        for item in candidates {
            let result = self
                .bounded(
                    "mark_mastered",
                    self.repository.mark_mastered(item.item_id, item.version),
                )
                .await;
            match result {
                Ok(()) => archived += 1,
                Err(ApiError::ConcurrentUpdateConflict(_)) | Err(ApiError::ItemNotFound(_)) => {
                    tracing::debug!(item_id = %item.item_id, "item changed during sweep, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        if archived > 0 {
            tracing::info!(archived, "marked items as mastered");
        }
        Ok(archived)
    }

    pub async fn get_queue_stats(&self, user_id: Uuid) -> Result<QueueStats> {
        let items = self
            .bounded("list_user_items", self.repository.list_user_items(user_id))
            .await?;
        Ok(QueueStats::from_items(&items, Utc::now()))
    }

    /// Bump the hint level written by the hint system.
    pub async fn increment_hint_level(&self, item_id: Uuid) -> Result<u32> {
        self.bounded(
            "increment_hint_level",
            self.repository.increment_hint_level(item_id),
        )
        .await?
        .ok_or(ApiError::ItemNotFound(item_id))
    }

    /// Next item state after a response. Pure.
    fn apply_response(
        &self,
        item: &ReviewItem,
        tracker: &MasteryTracker,
        response: &ReviewResponse,
        context: &ContextualFactors,
    ) -> (ReviewItem, MasteryUpdate, ScheduleResult) {
        let schedule = self.retention.compute_next_schedule(item, response);
        let mastery_update = self.mastery.apply(tracker, item, response);
        let attempted_at = response.timestamp.max(item.last_attempted_at);

        let mut next = item.clone();
        next.interval_days = schedule.interval_days;
        next.ease_factor = schedule.ease_factor;
        next.next_review_at = schedule.next_review_at;
        next.mastery_level = mastery_update.tracker.current_level;
        next.consecutive_correct = mastery_update.tracker.consecutive_correct;
        next.total_attempts += 1;
        if !response.is_correct() {
            next.incorrect_attempts += 1;
            next.last_missed_at = attempted_at.max(item.last_missed_at);
        }
        next.last_attempted_at = attempted_at;
        next.status = if mastery_update.tracker.is_master() {
            ItemStatus::Mastered
        } else {
            ItemStatus::Active
        };
        next.priority_score = rank_priority(&next, context, self.config.notable_threshold).score;

        (next, mastery_update, schedule)
    }

    async fn context_for(&self, item: &ReviewItem, now: DateTime<Utc>) -> Result<ContextualFactors> {
        let topical_accuracy = self
            .bounded(
                "topical_accuracy",
                self.learners
                    .topical_accuracy(item.user_id, item.section, &item.question_type),
            )
            .await?;
        let exam_date = self
            .bounded("exam_date", self.learners.exam_date(item.user_id))
            .await?;
        Ok(ContextualFactors {
            now,
            topical_accuracy,
            exam_date,
        })
    }

    /// Run a storage call under the configured timeout.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.storage_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, timeout_ms = self.storage_timeout.as_millis() as u64, "storage call timed out");
                Err(ApiError::StorageUnavailable(format!(
                    "{operation} timed out after {}ms",
                    self.storage_timeout.as_millis()
                )))
            }
        }
    }
}
