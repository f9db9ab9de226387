//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Upper bound for `max_interval_days`; keeps review dates representable.
pub const MAX_INTERVAL_CEILING: u32 = 36_500;

/// Tunables shared by the retention model, ranker and mastery state machine.
///
/// Constructed once and injected into the scheduler; nothing reads these
/// values from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub min_interval_days: u32,
    pub max_interval_days: u32,
    pub initial_ease: f64,
    pub minimum_ease: f64,
    /// Mastery level (0-100) required for the Master stage.
    pub target_level: f64,
    pub required_consecutive: u32,
    pub minimum_attempts: u32,
    /// EMA smoothing factor for mastery updates.
    pub mastery_alpha: f64,
    /// Sub-scores above this value are listed in priority explanations.
    pub notable_threshold: f64,
    pub max_daily_reviews: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval_days: 1,
            max_interval_days: 365,
            initial_ease: 2.5,
            minimum_ease: 1.3,
            target_level: 90.0,
            required_consecutive: 3,
            minimum_attempts: 5,
            mastery_alpha: 0.3,
            notable_threshold: 0.6,
            max_daily_reviews: 20,
        }
    }
}

impl SchedulerConfig {
    /// Check the values are mutually consistent.
    pub fn validate(&self) -> Result<()> {
        if self.min_interval_days == 0 {
            return Err(ValidationError::InvalidConfig(
                "min_interval_days must be at least 1".to_string(),
            ));
        }
        if self.max_interval_days > MAX_INTERVAL_CEILING {
            return Err(ValidationError::InvalidConfig(format!(
                "max_interval_days must be at most {MAX_INTERVAL_CEILING}, got {}",
                self.max_interval_days
            )));
        }
        if self.max_interval_days < self.min_interval_days {
            return Err(ValidationError::InvalidConfig(format!(
                "max_interval_days ({}) is below min_interval_days ({})",
                self.max_interval_days, self.min_interval_days
            )));
        }
        if self.minimum_ease < 1.3 || self.initial_ease < self.minimum_ease {
            return Err(ValidationError::InvalidConfig(
                "ease factors must be at least 1.3 and initial_ease >= minimum_ease".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.target_level) {
            return Err(ValidationError::InvalidConfig(format!(
                "target_level must be within 0-100, got {}",
                self.target_level
            )));
        }
        if !(self.mastery_alpha > 0.0 && self.mastery_alpha <= 1.0) {
            return Err(ValidationError::InvalidConfig(format!(
                "mastery_alpha must be within (0, 1], got {}",
                self.mastery_alpha
            )));
        }
        if self.max_daily_reviews == 0 {
            return Err(ValidationError::ZeroDailyCap);
        }
        Ok(())
    }
}
