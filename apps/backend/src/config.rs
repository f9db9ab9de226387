//! Service configuration loaded from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use review_core::SchedulerConfig;

/// Runtime configuration for the backend.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// How often the mastered-item sweep runs.
    pub cleanup_interval: Duration,
    /// Upper bound on any single storage call.
    pub storage_timeout: Duration,
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Read configuration from the process environment (after `.env`).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_or("PORT", 3000)?;
        let cleanup_interval = cleanup_interval(parse_or("CLEANUP_INTERVAL_SECS", 900)?)?;
        let storage_timeout = Duration::from_millis(parse_or("STORAGE_TIMEOUT_MS", 5000)?);

        let scheduler = scheduler_from_env()?;
        scheduler.validate()?;

        Ok(Self {
            database_url,
            host,
            port,
            cleanup_interval,
            storage_timeout,
            scheduler,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Scheduler defaults, overridden by `REVIEW_*` variables.
pub fn scheduler_from_env() -> anyhow::Result<SchedulerConfig> {
    let defaults = SchedulerConfig::default();
    Ok(SchedulerConfig {
        min_interval_days: parse_or("REVIEW_MIN_INTERVAL_DAYS", defaults.min_interval_days)?,
        max_interval_days: parse_or("REVIEW_MAX_INTERVAL_DAYS", defaults.max_interval_days)?,
        initial_ease: parse_or("REVIEW_INITIAL_EASE", defaults.initial_ease)?,
        minimum_ease: parse_or("REVIEW_MINIMUM_EASE", defaults.minimum_ease)?,
        target_level: parse_or("REVIEW_TARGET_LEVEL", defaults.target_level)?,
        required_consecutive: parse_or(
            "REVIEW_REQUIRED_CONSECUTIVE",
            defaults.required_consecutive,
        )?,
        minimum_attempts: parse_or("REVIEW_MINIMUM_ATTEMPTS", defaults.minimum_attempts)?,
        mastery_alpha: parse_or("REVIEW_MASTERY_ALPHA", defaults.mastery_alpha)?,
        notable_threshold: parse_or("REVIEW_NOTABLE_THRESHOLD", defaults.notable_threshold)?,
        max_daily_reviews: parse_or("REVIEW_MAX_DAILY_REVIEWS", defaults.max_daily_reviews)?,
    })
}

/// Sweep period; zero would make the ticker panic.
fn cleanup_interval(secs: u64) -> anyhow::Result<Duration> {
    anyhow::ensure!(secs > 0, "CLEANUP_INTERVAL_SECS must be at least 1");
    Ok(Duration::from_secs(secs))
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
