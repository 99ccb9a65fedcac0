//! Retry-wrapped storage operations.
//!
//! [`TransferClient`] composes around the raw [`ObjStorage`] interface and
//! applies one policy to every logical storage call (`fetch`, `store`,
//! `exists`):
//!
//! - up to the configured attempt budget on transient failure, with
//!   randomized exponential backoff (full jitter) between attempts
//! - the distinguished not-found condition is never retried and surfaces
//!   immediately as a permanent miss
//! - attempt-scoped timing per operation; a retry counter incremented when
//!   a retry pays off (policy-tunable)
//! - on exhaustion, the failure is logged with full context and handed to
//!   the error reporter before the error is surfaced to the caller
//!
//! Per invocation the state machine is
//! `Idle -> Attempting(k) -> {Success | Attempting(k+1) | PermanentMiss |
//! Exhausted}`. `PermanentMiss` and `Success` are terminal with no reporter
//! call; `Exhausted` is terminal with a reporter call and the error
//! surfaced as [`TransferError::Exhausted`].

use crate::config::RetryMetricPolicy;
use crate::error::ReplayError;
use crate::metrics;
use crate::objstorage::{ObjStorage, StorageResult};
use crate::record::{obj_hex, ObjectId};
use crate::reporter::{ErrorReporter, FailureContext};
use crate::resilience::RetryConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Terminal failure of one transfer operation.
#[derive(Debug)]
pub enum TransferError {
    /// The source confirmed the object absent. Permanent; the retry budget
    /// was not consumed and the error reporter was not called.
    Missing,

    /// The retry budget is spent. The failure has been logged and reported;
    /// the carried error is what the caller re-raises or converts to a
    /// `failed` outcome.
    Exhausted(ReplayError),
}

impl TransferError {
    /// Check for the permanent-miss terminal state.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// A retrying client over the raw storage interface.
///
/// One client serves all objects of a batch; it holds no per-object state.
pub struct TransferClient {
    retry: RetryConfig,
    metric_policy: RetryMetricPolicy,
    reporter: Arc<dyn ErrorReporter>,
}

impl TransferClient {
    /// Create a client with the given retry schedule and reporter.
    pub fn new(
        retry: RetryConfig,
        metric_policy: RetryMetricPolicy,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            retry,
            metric_policy,
            reporter,
        }
    }

    /// Fetch an object's bytes from a store, tenaciously.
    ///
    /// A not-found answer is surfaced as [`TransferError::Missing`] on the
    /// first attempt; absence after a deletion is expected and must not
    /// count against the retry or error budget.
    pub async fn fetch(
        &self,
        store: &dyn ObjStorage,
        id: ObjectId,
    ) -> Result<Vec<u8>, TransferError> {
        let bytes = self.run("get", id, || store.get(id)).await?;
        debug!(obj_id = %obj_hex(&id), len = bytes.len(), "retrieved object");
        Ok(bytes)
    }

    /// Store an object's bytes in a store, tenaciously.
    pub async fn store(
        &self,
        store: &dyn ObjStorage,
        id: ObjectId,
        content: Vec<u8>,
    ) -> Result<(), TransferError> {
        self.run("put", id, || store.add(id, content.clone()))
            .await?;
        debug!(obj_id = %obj_hex(&id), "stored object");
        Ok(())
    }

    /// Check if an object is already in a store, tenaciously.
    ///
    /// Transient failures on a presence check must not crash the batch, so
    /// the same retry policy applies.
    pub async fn exists(
        &self,
        store: &dyn ObjStorage,
        id: ObjectId,
    ) -> Result<bool, TransferError> {
        self.run("contains", id, || store.contains(id)).await
    }

    /// Drive one logical storage call through the retry state machine.
    async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        id: ObjectId,
        mut attempt_fn: F,
    ) -> Result<T, TransferError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let mut attempt = 1;
        loop {
            let started = Instant::now();
            let result = attempt_fn().await;
            metrics::record_operation_latency(operation, started.elapsed());

            match result {
                Ok(value) => {
                    if self.metric_policy == RetryMetricPolicy::OnSuccess && attempt > 1 {
                        metrics::record_retry(operation, attempt);
                    }
                    return Ok(value);
                }
                Err(err) if err.is_not_found() => {
                    // Permanent miss: no retry, no reporter record.
                    error!(
                        obj_id = %obj_hex(&id),
                        operation,
                        "failed to retrieve object: not found"
                    );
                    return Err(TransferError::Missing);
                }
                Err(err) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(self.exhausted(operation, id, attempt, &err).await);
                    }

                    if self.metric_policy == RetryMetricPolicy::EveryAttempt {
                        metrics::record_retry(operation, attempt);
                    }

                    let delay = self.retry.jittered_delay_for_attempt(attempt);
                    debug!(
                        obj_id = %obj_hex(&id),
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient storage failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Terminal path: log with full context, hand the record to the
    /// reporter, and build the surfaced error.
    async fn exhausted(
        &self,
        operation: &'static str,
        id: ObjectId,
        attempts: usize,
        err: &crate::objstorage::StorageError,
    ) -> TransferError {
        let obj_id = obj_hex(&id);
        error!(
            obj_id = %obj_id,
            operation,
            attempts,
            error = %err,
            "transfer failed after retries"
        );

        self.reporter
            .report(FailureContext {
                obj_id: obj_id.clone(),
                operation: operation.to_string(),
                error: err.to_string(),
                retries: attempts,
            })
            .await;

        TransferError::Exhausted(ReplayError::RetriesExhausted {
            operation: operation.to_string(),
            obj_id,
            attempts,
            message: err.to_string(),
        })
    }
}
