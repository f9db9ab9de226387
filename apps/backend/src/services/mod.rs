//! Business logic services

pub mod scheduler;
pub mod sweeper;

pub use scheduler::Scheduler;
