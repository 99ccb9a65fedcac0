//! Resilience utilities: retry schedule and bounded concurrency.
//!
//! - [`RetryConfig`]: randomized exponential backoff for transient storage
//!   failures
//! - [`Bulkhead`]: semaphore limiting concurrent pipeline invocations
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), objstore_replayer::resilience::BulkheadFull> {
//! use objstore_replayer::resilience::{Bulkhead, RetryConfig};
//!
//! let retry = RetryConfig::default();
//! let delay = retry.jittered_delay_for_attempt(1);
//!
//! // Bulkhead: max 16 concurrent copies
//! let bulkhead = Bulkhead::new(16);
//! let _permit = bulkhead.acquire().await?;
//! // permit dropped = slot released
//! # Ok(())
//! # }
//! ```

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Configuration for retrying transient storage failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempt budget per operation (first attempt included).
    pub max_attempts: usize,

    /// Base delay for the exponential backoff schedule.
    pub initial_delay: Duration,

    /// Maximum delay between attempts (ceiling for exponential backoff).
    pub max_delay: Duration,

    /// Backoff multiplier (e.g., 2.0 = double delay each retry).
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    /// Three attempts, 1s base, 60s cap: the schedule used in production
    /// for per-object storage calls.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Fast-fail retry for tests.
    pub fn testing() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_factor: 2.0,
        }
    }

    /// Calculate the backoff ceiling for a given attempt number (1-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        // Cap before converting: the multiplier overflows f64 (and then
        // Duration) around attempt 66 with a 2.0 factor. f64::min also
        // discards a NaN from 0 * inf, so the cap always wins.
        let multiplier = self.backoff_factor.powi((attempt - 1) as i32);
        let secs = (self.initial_delay.as_secs_f64() * multiplier).min(self.max_delay.as_secs_f64());

        Duration::from_secs_f64(secs)
    }

    /// Full-jitter delay for a given attempt: uniform in
    /// `[0, delay_for_attempt(attempt)]`.
    ///
    /// Many objects retry concurrently within a batch; jitter keeps their
    /// retries from synchronizing into storms against the same backend.
    pub fn jittered_delay_for_attempt(&self, attempt: usize) -> Duration {
        let cap = self.delay_for_attempt(attempt);
        cap.mul_f64(rand::thread_rng().gen::<f64>())
    }
}

// =============================================================================
// Bulkhead (Concurrency Limiter)
// =============================================================================

/// Error when the bulkhead's semaphore has been closed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("bulkhead full: max {max_concurrent} concurrent operations")]
pub struct BulkheadFull {
    /// Maximum concurrent operations allowed.
    pub max_concurrent: usize,
}

/// Bulkhead pattern: limits concurrent operations to prevent resource
/// exhaustion.
///
/// The batch orchestrator spawns one task per record but each task acquires
/// a permit before touching storage, so at most `max_concurrent` copies are
/// in flight. A task sleeping in backoff occupies only its own slot.
#[derive(Debug)]
pub struct Bulkhead {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Bulkhead {
    /// Create a new bulkhead with the given concurrency limit.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Acquire a permit, waiting if necessary.
    ///
    /// Returns a permit that releases the slot when dropped.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, BulkheadFull> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BulkheadFull {
                max_concurrent: self.max_concurrent,
            })
    }

    /// Get the maximum concurrent operations allowed.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
