//! Error types for review-core.

use thiserror::Error;

/// Result type alias using ValidationError.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Input rejected before any scheduling state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("quality must be between 0 and 5, got {0}")]
    QualityOutOfRange(u8),

    #[error("time spent must not be negative, got {0}")]
    NegativeTimeSpent(f64),

    #[error("difficulty must be between 1 and 10, got {0}")]
    DifficultyOutOfRange(u8),

    #[error("a missed answer must have quality below 3, got {0}")]
    NotAMiss(u8),

    #[error("max daily reviews must be at least 1")]
    ZeroDailyCap,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
