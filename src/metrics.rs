//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Per-object decisions (copied / skipped / failed, by reason)
//! - Storage operation latency (get / put / contains)
//! - Retries that paid off
//! - Bytes copied
//! - Batch throughput
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replayer_` and follow Prometheus
//! conventions: counters end in `_total`, histograms track distributions.
//! The functions are no-ops when no recorder is installed, which is how
//! tests run.
//!
//! # Usage
//!
//! ```rust,no_run
//! use objstore_replayer::metrics;
//! use std::time::Duration;
//!
//! metrics::record_decision("copied");
//! metrics::record_operation_latency("get", Duration::from_millis(12));
//! ```

use metrics::{counter, histogram};
use std::time::Duration;

/// Record the outcome decision for one object record.
///
/// Decision values: `copied`, `excluded`, `in_dst`, `not_in_src`, `failed`.
/// Visibility skips go through [`record_skipped_status`] so they can carry
/// the status that caused the skip.
pub fn record_decision(decision: &str) {
    counter!("replayer_operations_total", "decision" => decision.to_string()).increment(1);
}

/// Record a visibility skip, tagged with the record's status.
pub fn record_skipped_status(status: &str) {
    counter!(
        "replayer_operations_total",
        "decision" => "skipped",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record one storage attempt's latency, tagged by operation.
pub fn record_operation_latency(operation: &str, duration: Duration) {
    histogram!("replayer_operation_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

/// Record a retry, tagged by operation and attempt number.
///
/// Under the default policy this fires only on an attempt that succeeds
/// after at least one failure, surfacing how often retries pay off rather
/// than double-counting every retry.
pub fn record_retry(operation: &str, attempt: usize) {
    counter!(
        "replayer_retries_total",
        "operation" => operation.to_string(),
        "attempt" => attempt.to_string()
    )
    .increment(1);
}

/// Record bytes successfully copied to the destination.
pub fn record_bytes_copied(bytes: u64) {
    counter!("replayer_bytes_total").increment(bytes);
}

/// Record batch completion with aggregate stats.
pub fn record_batch(total: usize, copied: usize, skipped: usize, failed: usize, elapsed: Duration) {
    counter!("replayer_batches_total").increment(1);
    counter!("replayer_batch_objects_total").increment(total as u64);
    counter!("replayer_batch_copied_total").increment(copied as u64);
    counter!("replayer_batch_skipped_total").increment(skipped as u64);

    if failed > 0 {
        counter!("replayer_batch_failed_total").increment(failed as u64);
    }

    histogram!("replayer_batch_duration_seconds").record(elapsed.as_secs_f64());
}
