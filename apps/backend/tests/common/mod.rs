//! Common test utilities and fixtures for integration tests.
//!
//! `TestContext::new` runs the full router over the in-memory repository.
//! `TestContext::with_database` uses PostgreSQL (set DATABASE_URL) and is
//! only used by tests marked `#[ignore = "requires database"]`.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use axum::Router;
use uuid::Uuid;

use review_core::SchedulerConfig;
use review_scheduler_backend::db::{Database, MemoryRepository};
use review_scheduler_backend::services::Scheduler;
use review_scheduler_backend::{router, AppState};

/// Test context containing the repository and router.
pub struct TestContext {
    pub repo: Arc<MemoryRepository>,
    pub scheduler: Arc<Scheduler>,
    app: Router,
}

impl TestContext {
    /// In-memory context preloaded with the fixture question bank.
    pub async fn new() -> Self {
        let repo = Arc::new(MemoryRepository::new());
        for (question_id, metadata) in fixtures::question_bank() {
            repo.add_question(question_id, metadata).await;
        }

        let scheduler = Arc::new(
            Scheduler::from_store(repo.clone(), SchedulerConfig::default())
                .expect("default config is valid"),
        );
        let app = router(AppState {
            scheduler: scheduler.clone(),
        });

        Self {
            repo,
            scheduler,
            app,
        }
    }

    /// Router over PostgreSQL.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn with_database() -> (Arc<Database>, Router) {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let db = Arc::new(db);
        let scheduler = Scheduler::from_store(db.clone(), SchedulerConfig::default())
            .expect("default config is valid");
        let app = router(AppState {
            scheduler: Arc::new(scheduler),
        });

        (db, app)
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn new_user() -> Uuid {
        Uuid::new_v4()
    }
}

/// Remove a test learner's rows from PostgreSQL.
pub async fn cleanup_user(db: &Database, user_id: Uuid) {
    // Delete in order due to foreign keys
    let _ = sqlx::query(
        "DELETE FROM mastery_trackers WHERE item_id IN (SELECT id FROM review_items WHERE user_id = $1)",
    )
    .bind(user_id)
    .execute(db.pool())
    .await;

    let _ = sqlx::query("DELETE FROM review_items WHERE user_id = $1")
        .bind(user_id)
        .execute(db.pool())
        .await;
}
