//! Core review scheduling library.
//!
//! Provides:
//! - Adaptive SM-2 retention model (next interval, ease, graduation)
//! - Priority ranking of due items
//! - Mastery state machine
//! - Daily workload balancing and queue statistics
//! - Shared types (ReviewItem, ReviewResponse, MasteryTracker, etc.)
//!
//! Everything here is pure and synchronous; persistence and coordination
//! live in the service crate.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod mastery;
pub mod priority;
pub mod stats;
pub mod types;
pub mod workload;

pub use algorithm::{AdaptiveSm2, RetentionModel, ScheduleResult};
pub use config::SchedulerConfig;
pub use error::{Result, ValidationError};
pub use mastery::{MasteryStateMachine, MasteryUpdate};
pub use priority::{rank_priority, ContextualFactors, PriorityRanking, RankedItem};
pub use stats::QueueStats;
pub use types::{
    Confidence, ItemMetadata, ItemStatus, MasteryStage, MasteryTracker, QuestionMetadata,
    ReviewItem, ReviewResponse, Section,
};
pub use workload::optimize_schedule;
