//! Configuration for the replay engine.
//!
//! [`ReplayConfig`] is passed to
//! [`ContentReplayer::new()`](crate::ContentReplayer::new) and can be
//! constructed programmatically or deserialized from YAML/JSON. Every field
//! has a serde default, so a partial document is enough:
//!
//! ```yaml
//! concurrency: 32
//! check_dst: true
//! retry_max_attempts: 3
//! retry_initial_delay_ms: 1000
//! retry_max_delay_ms: 60000
//! ```

use crate::error::ReplayError;
use crate::resilience::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When to increment the retry counter metric.
///
/// The production default only counts attempts that succeed after at least
/// one failure, surfacing how often retries pay off. `EveryAttempt` counts
/// each scheduled retry instead; useful when tuning the backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryMetricPolicy {
    #[default]
    OnSuccess,
    EveryAttempt,
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Worker limit for concurrent object copies within one batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Check the destination for presence before fetching from the source.
    ///
    /// When set, an object already present downstream is skipped without
    /// touching the source.
    #[serde(default = "default_true")]
    pub check_dst: bool,

    /// Attempt budget per storage operation (first attempt included).
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,

    /// Base delay of the retry backoff schedule (ms).
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    /// Ceiling of the retry backoff schedule (ms).
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Backoff multiplier between attempts.
    #[serde(default = "default_retry_backoff_factor")]
    pub retry_backoff_factor: f64,

    /// Retry counter metric policy.
    #[serde(default)]
    pub retry_metric_policy: RetryMetricPolicy,
}

fn default_concurrency() -> usize {
    16
}

fn default_true() -> bool {
    true
}

fn default_retry_max_attempts() -> usize {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    60_000
}

fn default_retry_backoff_factor() -> f64 {
    2.0
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            check_dst: default_true(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_backoff_factor: default_retry_backoff_factor(),
            retry_metric_policy: RetryMetricPolicy::default(),
        }
    }
}

impl ReplayConfig {
    /// Fast-fail configuration for tests: tiny delays, small concurrency.
    pub fn for_testing() -> Self {
        Self {
            concurrency: 4,
            check_dst: true,
            retry_max_attempts: 3,
            retry_initial_delay_ms: 1,
            retry_max_delay_ms: 10,
            retry_backoff_factor: 2.0,
            retry_metric_policy: RetryMetricPolicy::default(),
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.concurrency == 0 {
            return Err(ReplayError::Config(
                "concurrency must be nonzero".to_string(),
            ));
        }
        if self.retry_max_attempts == 0 {
            return Err(ReplayError::Config(
                "retry_max_attempts must be nonzero".to_string(),
            ));
        }
        if self.retry_backoff_factor < 1.0 {
            return Err(ReplayError::Config(
                "retry_backoff_factor must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the retry schedule from the `_ms` fields.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            backoff_factor: self.retry_backoff_factor,
        }
    }
}
