//! Periodic mastered-item sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::Scheduler;

/// Run [`Scheduler::cleanup_mastered`] every `every` until the runtime stops.
///
/// A failed sweep is logged and the next tick tries again.
pub fn spawn_cleanup_task(scheduler: Arc<Scheduler>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match scheduler.cleanup_mastered().await {
                Ok(0) => tracing::debug!("cleanup sweep found nothing to archive"),
                Ok(archived) => tracing::info!(archived, "cleanup sweep finished"),
                Err(e) => tracing::warn!(error = %e, kind = e.kind(), "cleanup sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryRepository, ReviewRepository};
    use crate::models::*;
    use chrono::{TimeZone, Utc};
    use review_core::SchedulerConfig;
    use uuid::Uuid;

    #[tokio::test]
    async fn sweep_task_archives_masters() {
        let repo = Arc::new(MemoryRepository::new());
        let config = SchedulerConfig::default();
        let metadata = QuestionMetadata {
            section: Section::Comprehension,
            question_type: "main point".to_string(),
            difficulty: 4,
        };
        let missed_at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let item = ReviewItem::from_miss(Uuid::new_v4(), "rc-mp-002", &metadata, missed_at, &config);
        let mut tracker = MasteryTracker::new(item.item_id, &config);
        tracker.stage = MasteryStage::Master;
        repo.insert_item(&item, &tracker).await.unwrap();

        let scheduler = Arc::new(Scheduler::from_store(repo.clone(), config).unwrap());
        let handle = spawn_cleanup_task(scheduler, Duration::from_millis(10));

        let mut archived = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let (stored, _) = repo.find_item(item.item_id).await.unwrap().unwrap();
            if stored.status == ItemStatus::Mastered {
                archived = true;
                break;
            }
        }
        handle.abort();
        assert!(archived);
    }
}
