//! Storage for review items: PostgreSQL plus an in-memory store.

pub mod memory;
pub mod repository;

pub use memory::MemoryRepository;
pub use repository::{LearnerProfile, QuestionBank, ReviewRepository};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;

const ITEM_COLUMNS: &str = r#"
    i.id, i.user_id, i.question_id, i.section, i.question_type, i.difficulty,
    i.interval_days, i.ease_factor, i.next_review_at, i.mastery_level,
    i.incorrect_attempts, i.total_attempts, i.consecutive_correct,
    i.last_attempted_at, i.last_missed_at, i.created_at, i.priority_score,
    i.status, i.hint_level, i.version
"#;

const TRACKER_COLUMNS: &str = r#"
    item_id, current_level, target_level, consecutive_correct, required_consecutive,
    attempt_count, minimum_attempts, stage, mastery_achieved_at, version
"#;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_tracker(&self, item_id: Uuid) -> Result<MasteryTracker> {
        let row = sqlx::query_as::<_, DbMasteryTracker>(&format!(
            "SELECT {TRACKER_COLUMNS} FROM mastery_trackers WHERE item_id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("item {item_id} has no mastery tracker")))?;

        row.to_core_tracker()
    }

    async fn with_tracker(
        &self,
        row: Option<DbReviewItem>,
    ) -> Result<Option<(ReviewItem, MasteryTracker)>> {
        match row {
            Some(row) => {
                let item = row.to_core_item()?;
                let tracker = self.fetch_tracker(item.item_id).await?;
                Ok(Some((item, tracker)))
            }
            None => Ok(None),
        }
    }

    /// Distinguish a stale version from a missing row after a guarded write.
    async fn version_miss(tx: &mut Transaction<'_, Postgres>, item_id: Uuid) -> ApiError {
        let exists = sqlx::query("SELECT 1 FROM review_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&mut **tx)
            .await;

        match exists {
            Ok(Some(_)) => ApiError::ConcurrentUpdateConflict(item_id),
            Ok(None) => ApiError::ItemNotFound(item_id),
            Err(e) => ApiError::Database(e),
        }
    }

    async fn bump_tracker_version(
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
        version: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE mastery_trackers SET version = $2 WHERE item_id = $1")
            .bind(item_id)
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReviewRepository for Database {
    async fn find_item(&self, item_id: Uuid) -> Result<Option<(ReviewItem, MasteryTracker)>> {
        let row = sqlx::query_as::<_, DbReviewItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM review_items i WHERE i.id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_tracker(row).await
    }

    async fn find_item_by_question(
        &self,
        user_id: Uuid,
        question_id: &str,
    ) -> Result<Option<(ReviewItem, MasteryTracker)>> {
        let row = sqlx::query_as::<_, DbReviewItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM review_items i WHERE i.user_id = $1 AND i.question_id = $2"
        ))
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_tracker(row).await
    }

    async fn insert_item(&self, item: &ReviewItem, tracker: &MasteryTracker) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO review_items (id, user_id, question_id, section, question_type, difficulty,
                                      interval_days, ease_factor, next_review_at, mastery_level,
                                      incorrect_attempts, total_attempts, consecutive_correct,
                                      last_attempted_at, last_missed_at, created_at,
                                      priority_score, status, hint_level, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT (user_id, question_id) DO NOTHING
            "#,
        )
        .bind(item.item_id)
        .bind(item.user_id)
        .bind(&item.question_id)
        .bind(item.section.as_str())
        .bind(&item.question_type)
        .bind(item.difficulty as i32)
        .bind(item.interval_days as i32)
        .bind(item.ease_factor)
        .bind(item.next_review_at)
        .bind(item.mastery_level)
        .bind(item.incorrect_attempts as i32)
        .bind(item.total_attempts as i32)
        .bind(item.consecutive_correct as i32)
        .bind(item.last_attempted_at)
        .bind(item.last_missed_at)
        .bind(item.created_at)
        .bind(item.priority_score)
        .bind(item.status.as_str())
        .bind(item.metadata.hint_level as i32)
        .bind(item.version)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(ApiError::ConcurrentUpdateConflict(item.item_id));
        }

        sqlx::query(
            r#"
            INSERT INTO mastery_trackers (item_id, current_level, target_level, consecutive_correct,
                                          required_consecutive, attempt_count, minimum_attempts,
                                          stage, mastery_achieved_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(tracker.item_id)
        .bind(tracker.current_level)
        .bind(tracker.target_level)
        .bind(tracker.consecutive_correct as i32)
        .bind(tracker.required_consecutive as i32)
        .bind(tracker.attempt_count as i32)
        .bind(tracker.minimum_attempts as i32)
        .bind(tracker.stage.as_str())
        .bind(tracker.mastery_achieved_at)
        .bind(item.version)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn save_review_state(
        &self,
        item: &ReviewItem,
        tracker: &MasteryTracker,
        expected_version: i64,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE review_items SET
                interval_days = $3,
                ease_factor = $4,
                next_review_at = $5,
                mastery_level = $6,
                incorrect_attempts = $7,
                total_attempts = $8,
                consecutive_correct = $9,
                last_attempted_at = $10,
                last_missed_at = $11,
                priority_score = $12,
                status = $13,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(item.item_id)
        .bind(expected_version)
        .bind(item.interval_days as i32)
        .bind(item.ease_factor)
        .bind(item.next_review_at)
        .bind(item.mastery_level)
        .bind(item.incorrect_attempts as i32)
        .bind(item.total_attempts as i32)
        .bind(item.consecutive_correct as i32)
        .bind(item.last_attempted_at)
        .bind(item.last_missed_at)
        .bind(item.priority_score)
        .bind(item.status.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let version: i64 = match updated {
            Some(row) => row.get("version"),
            None => return Err(Self::version_miss(&mut tx, item.item_id).await),
        };

        sqlx::query(
            r#"
            UPDATE mastery_trackers SET
                current_level = $2,
                target_level = $3,
                consecutive_correct = $4,
                required_consecutive = $5,
                attempt_count = $6,
                minimum_attempts = $7,
                stage = $8,
                mastery_achieved_at = $9,
                version = $10
            WHERE item_id = $1
            "#,
        )
        .bind(tracker.item_id)
        .bind(tracker.current_level)
        .bind(tracker.target_level)
        .bind(tracker.consecutive_correct as i32)
        .bind(tracker.required_consecutive as i32)
        .bind(tracker.attempt_count as i32)
        .bind(tracker.minimum_attempts as i32)
        .bind(tracker.stage.as_str())
        .bind(tracker.mastery_achieved_at)
        .bind(version)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(version)
    }

    async fn list_due_items(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<ReviewItem>> {
        let rows = sqlx::query_as::<_, DbReviewItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM review_items i
            WHERE i.user_id = $1 AND i.status <> 'mastered' AND i.next_review_at <= $2
            ORDER BY i.next_review_at
            "#
        ))
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(DbReviewItem::to_core_item).collect()
    }

    async fn list_user_items(&self, user_id: Uuid) -> Result<Vec<ReviewItem>> {
        let rows = sqlx::query_as::<_, DbReviewItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM review_items i WHERE i.user_id = $1 ORDER BY i.created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(DbReviewItem::to_core_item).collect()
    }

    async fn list_unarchived_masters(&self) -> Result<Vec<ReviewItem>> {
        let rows = sqlx::query_as::<_, DbReviewItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM review_items i
            JOIN mastery_trackers t ON t.item_id = i.id
            WHERE t.stage = 'master' AND i.status <> 'mastered'
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(DbReviewItem::to_core_item).collect()
    }

    async fn mark_mastered(&self, item_id: Uuid, expected_version: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE review_items
            SET status = 'mastered', version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(item_id)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await?;

        let version: i64 = match updated {
            Some(row) => row.get("version"),
            None => return Err(Self::version_miss(&mut tx, item_id).await),
        };
        Self::bump_tracker_version(&mut tx, item_id, version).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reschedule_items(&self, moves: &[(Uuid, DateTime<Utc>, i64)]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for (item_id, next_review_at, expected_version) in moves {
            let updated = sqlx::query(
                r#"
                UPDATE review_items
                SET next_review_at = $3, version = version + 1, updated_at = NOW()
                WHERE id = $1 AND version = $2
                RETURNING version
                "#,
            )
            .bind(item_id)
            .bind(expected_version)
            .bind(next_review_at)
            .fetch_optional(&mut *tx)
            .await?;

            let version: i64 = match updated {
                Some(row) => row.get("version"),
                None => return Err(Self::version_miss(&mut tx, *item_id).await),
            };
            Self::bump_tracker_version(&mut tx, *item_id, version).await?;
        }

        tx.commit().await?;
        Ok(moves.len())
    }

    async fn update_priority_scores(&self, scores: &[(Uuid, f64)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (item_id, score) in scores {
            sqlx::query("UPDATE review_items SET priority_score = $2 WHERE id = $1")
                .bind(item_id)
                .bind(score)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn increment_hint_level(&self, item_id: Uuid) -> Result<Option<u32>> {
        let row = sqlx::query(
            r#"
            UPDATE review_items
            SET hint_level = hint_level + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING hint_level
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<i32, _>("hint_level").max(0) as u32))
    }
}

#[async_trait]
impl QuestionBank for Database {
    async fn get_question_metadata(&self, question_id: &str) -> Result<Option<QuestionMetadata>> {
        let question = sqlx::query_as::<_, DbQuestion>(
            r#"
            SELECT question_id, section, question_type, difficulty
            FROM questions
            WHERE question_id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(question.and_then(|q| q.to_metadata()))
    }
}

#[async_trait]
impl LearnerProfile for Database {
    async fn topical_accuracy(
        &self,
        user_id: Uuid,
        section: Section,
        question_type: &str,
    ) -> Result<Option<f64>> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_attempts), 0) AS attempts,
                   COALESCE(SUM(incorrect_attempts), 0) AS incorrect
            FROM review_items
            WHERE user_id = $1 AND section = $2 AND question_type = $3
            "#,
        )
        .bind(user_id)
        .bind(section.as_str())
        .bind(question_type)
        .fetch_one(&self.pool)
        .await?;

        let attempts: i64 = row.get("attempts");
        let incorrect: i64 = row.get("incorrect");
        Ok(accuracy_from_counts(attempts, incorrect))
    }

    async fn exam_date(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let exam_date = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT exam_date FROM learner_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(exam_date.flatten())
    }
}

/// Accuracy from attempt counters, None without attempts.
pub fn accuracy_from_counts(attempts: i64, incorrect: i64) -> Option<f64> {
    if attempts <= 0 {
        return None;
    }
    Some(1.0 - incorrect.clamp(0, attempts) as f64 / attempts as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_without_attempts() {
        assert_eq!(accuracy_from_counts(0, 0), None);
    }

    #[test]
    fn test_accuracy_from_counts() {
        assert_eq!(accuracy_from_counts(4, 1), Some(0.75));
        assert_eq!(accuracy_from_counts(3, 7), Some(0.0));
    }
}
