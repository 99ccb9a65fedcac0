//! Decision pipeline and batch orchestrator.
//!
//! The event-stream client invokes [`ContentReplayer::replay`] once per
//! batch with a mapping `{object_type: [record, ...]}`. Only `content`
//! records are replayed; other types are logged as unexpected and ignored.
//!
//! # Per-object decision order
//!
//! Cheapest checks first, short-circuiting:
//!
//! 1. `status != visible` -> skipped (no storage I/O)
//! 2. exclusion predicate matches -> skipped (no storage I/O)
//! 3. destination already holds the hash (when `check_dst`) -> skipped
//! 4. fetch from source, store at destination -> copied; a source miss is
//!    a skip, not a failure (absence after a deletion is expected)
//!
//! # Concurrency
//!
//! One task per record on a [`JoinSet`], gated by a [`Bulkhead`] so at most
//! `concurrency` copies touch storage at once. Each task returns its own
//! [`TransferOutcome`]; the orchestrator merges them after join, so no
//! counter update can be lost to a race. Classified storage failures never
//! escape a task; a panicking task is a defect that aborts the batch after
//! every already-spawned task has drained.

use crate::config::ReplayConfig;
use crate::error::{ReplayError, Result};
use crate::metrics;
use crate::objstorage::ObjStorage;
use crate::record::{obj_hex, ContentRecord};
use crate::reporter::{ErrorReporter, NoOpReporter};
use crate::resilience::Bulkhead;
use crate::transfer::{TransferClient, TransferError};
use crate::watchdog::{NoOpWatchdog, Watchdog};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// One delivery unit from the event stream: records grouped by object type.
pub type RecordBatch = HashMap<String, Vec<ContentRecord>>;

/// Predicate deciding whether a record must not be replicated.
pub type ExcludeFn = Arc<dyn Fn(&ContentRecord) -> bool + Send + Sync>;

/// Why an object was skipped rather than copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Record status was not `visible`.
    Invisible,
    /// The exclusion predicate matched.
    Excluded,
    /// The destination already holds the object.
    AlreadyPresent,
    /// The source confirmed the object absent.
    NotFoundAtSource,
}

impl SkipReason {
    /// Decision tag recorded in metrics.
    pub fn decision(&self) -> &'static str {
        match self {
            Self::Invisible => "skipped",
            Self::Excluded => "excluded",
            Self::AlreadyPresent => "in_dst",
            Self::NotFoundAtSource => "not_in_src",
        }
    }
}

/// Outcome of the decision pipeline for one object record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The object was fetched from the source and stored at the
    /// destination.
    Copied { bytes: u64 },
    /// The object was deliberately not copied.
    Skipped(SkipReason),
    /// A storage operation exhausted its retry budget; the failure is in
    /// the logs and the error reporter.
    Failed,
}

/// Counters accumulated across all pipeline invocations of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub copied: usize,
    pub failed: usize,
    pub skipped_invisible: usize,
    pub skipped_excluded: usize,
    pub skipped_already_present: usize,
    pub skipped_not_found: usize,
    /// Cumulative bytes copied to the destination.
    pub bytes: u64,
}

impl BatchStats {
    /// Fold one outcome into the counters.
    pub fn merge(&mut self, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Copied { bytes } => {
                self.copied += 1;
                self.bytes += bytes;
            }
            TransferOutcome::Failed => self.failed += 1,
            TransferOutcome::Skipped(SkipReason::Invisible) => self.skipped_invisible += 1,
            TransferOutcome::Skipped(SkipReason::Excluded) => self.skipped_excluded += 1,
            TransferOutcome::Skipped(SkipReason::AlreadyPresent) => {
                self.skipped_already_present += 1
            }
            TransferOutcome::Skipped(SkipReason::NotFoundAtSource) => {
                self.skipped_not_found += 1
            }
        }
    }

    /// Total skips across all reasons.
    pub fn skipped(&self) -> usize {
        self.skipped_invisible
            + self.skipped_excluded
            + self.skipped_already_present
            + self.skipped_not_found
    }

    /// Total records that produced an outcome.
    pub fn total(&self) -> usize {
        self.copied + self.failed + self.skipped()
    }
}

/// Finalized statistics for one processed batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchSummary {
    pub stats: BatchStats,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Objects processed per second.
    pub fn objects_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.stats.total() as f64 / secs
        } else {
            0.0
        }
    }

    /// Megabytes copied per second.
    pub fn mbytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.stats.bytes as f64 / 1024.0 / 1024.0 / secs
        } else {
            0.0
        }
    }
}

/// Replays content objects from a source store to a destination store.
///
/// # Example
///
/// ```rust
/// use objstore_replayer::config::ReplayConfig;
/// use objstore_replayer::objstorage::{InMemoryObjStorage, ObjStorage};
/// use objstore_replayer::record::ContentRecord;
/// use objstore_replayer::replay::{ContentReplayer, RecordBatch};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let src = Arc::new(InMemoryObjStorage::new());
/// let dst = Arc::new(InMemoryObjStorage::new());
/// let id = [7u8; 20];
/// src.add(id, b"payload".to_vec()).await.unwrap();
///
/// let replayer = ContentReplayer::new(src, dst.clone(), ReplayConfig::for_testing());
///
/// let mut batch = RecordBatch::new();
/// batch.insert("content".to_string(), vec![ContentRecord::visible(id)]);
/// let summary = replayer.replay(batch).await.unwrap();
///
/// assert_eq!(summary.stats.copied, 1);
/// assert!(dst.contains(id).await.unwrap());
/// # }
/// ```
pub struct ContentReplayer {
    src: Arc<dyn ObjStorage>,
    dst: Arc<dyn ObjStorage>,
    config: ReplayConfig,
    exclude: Option<ExcludeFn>,
    reporter: Arc<dyn ErrorReporter>,
    watchdog: Arc<dyn Watchdog>,
}

impl ContentReplayer {
    /// Create a replayer with a no-op reporter and watchdog.
    pub fn new(src: Arc<dyn ObjStorage>, dst: Arc<dyn ObjStorage>, config: ReplayConfig) -> Self {
        Self {
            src,
            dst,
            config,
            exclude: None,
            reporter: Arc::new(NoOpReporter),
            watchdog: Arc::new(NoOpWatchdog),
        }
    }

    /// Install an exclusion predicate.
    pub fn with_exclusion(mut self, exclude: ExcludeFn) -> Self {
        self.exclude = Some(exclude);
        self
    }

    /// Install a durable error reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Install a process-supervisor liveness sink.
    pub fn with_watchdog(mut self, watchdog: Arc<dyn Watchdog>) -> Self {
        self.watchdog = watchdog;
        self
    }

    /// Process one batch delivered by the event-stream client.
    ///
    /// Returns normally (with a summary) when every record has produced an
    /// outcome; the caller acknowledges the batch on normal return. Returns
    /// [`ReplayError::Config`] if the configuration is unusable, and
    /// [`ReplayError::Defect`] if a pipeline task panicked — the batch must
    /// not be acknowledged in either case.
    pub async fn replay(&self, batch: RecordBatch) -> Result<BatchSummary> {
        self.config.validate()?;

        let started = Instant::now();
        let bulkhead = Arc::new(Bulkhead::new(self.config.concurrency));
        let transfer = Arc::new(TransferClient::new(
            self.config.retry(),
            self.config.retry_metric_policy,
            Arc::clone(&self.reporter),
        ));

        let mut join_set: JoinSet<TransferOutcome> = JoinSet::new();

        for (object_type, records) in batch {
            if object_type != "content" {
                warn!(
                    object_type = %object_type,
                    count = records.len(),
                    "received a series of non-content objects, this should not happen"
                );
                continue;
            }

            for record in records {
                let src = Arc::clone(&self.src);
                let dst = Arc::clone(&self.dst);
                let transfer = Arc::clone(&transfer);
                let bulkhead = Arc::clone(&bulkhead);
                let exclude = self.exclude.clone();
                let check_dst = self.config.check_dst;

                join_set.spawn(async move {
                    let _permit = match bulkhead.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            // Only reachable if the semaphore is closed,
                            // which the orchestrator never does.
                            error!(error = %e, "failed to acquire worker slot");
                            return TransferOutcome::Failed;
                        }
                    };
                    process_record(&record, &*src, &*dst, &transfer, exclude, check_dst).await
                });
            }
        }

        // Observe every outcome before declaring the batch done. A panicked
        // task is a defect, but already-spawned work still drains first.
        let mut stats = BatchStats::default();
        let mut defect: Option<ReplayError> = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => stats.merge(&outcome),
                Err(e) => {
                    error!(error = %e, "pipeline task failed, aborting batch after drain");
                    if defect.is_none() {
                        defect = Some(ReplayError::Defect(format!(
                            "pipeline task panicked: {}",
                            e
                        )));
                    }
                }
            }
        }

        if let Some(defect) = defect {
            return Err(defect);
        }

        let summary = BatchSummary {
            stats,
            elapsed: started.elapsed(),
        };

        info!(
            total = stats.total(),
            copied = stats.copied,
            failed = stats.failed,
            skipped = stats.skipped(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            objects_per_sec = format!("{:.1}", summary.objects_per_sec()),
            mbytes_per_sec = format!("{:.1}", summary.mbytes_per_sec()),
            "processed content objects"
        );
        metrics::record_batch(
            stats.total(),
            stats.copied,
            stats.skipped(),
            stats.failed,
            summary.elapsed,
        );

        self.watchdog.notify();
        Ok(summary)
    }
}

/// Decision pipeline for one object record.
///
/// Produces exactly one outcome and never returns an error: classified
/// storage failures become [`TransferOutcome::Failed`]. Only a programming
/// error (a panic, e.g. inside the exclusion predicate) escapes, which the
/// orchestrator treats as a defect.
async fn process_record(
    record: &ContentRecord,
    src: &dyn ObjStorage,
    dst: &dyn ObjStorage,
    transfer: &TransferClient,
    exclude: Option<ExcludeFn>,
    check_dst: bool,
) -> TransferOutcome {
    let id = record.sha1;

    if !record.is_visible() {
        debug!(
            obj_id = %obj_hex(&id),
            status = record.status.as_str(),
            "skipped object"
        );
        metrics::record_skipped_status(record.status.as_str());
        return TransferOutcome::Skipped(SkipReason::Invisible);
    }

    if let Some(exclude) = exclude {
        if exclude(record) {
            debug!(obj_id = %obj_hex(&id), "skipped object (excluded)");
            metrics::record_decision(SkipReason::Excluded.decision());
            return TransferOutcome::Skipped(SkipReason::Excluded);
        }
    }

    if check_dst {
        match transfer.exists(dst, id).await {
            Ok(true) => {
                debug!(obj_id = %obj_hex(&id), "skipped object (in dst)");
                metrics::record_decision(SkipReason::AlreadyPresent.decision());
                return TransferOutcome::Skipped(SkipReason::AlreadyPresent);
            }
            Ok(false) => {}
            Err(_) => {
                metrics::record_decision("failed");
                return TransferOutcome::Failed;
            }
        }
    }

    let bytes = match transfer.fetch(src, id).await {
        Ok(bytes) => bytes,
        Err(TransferError::Missing) => {
            metrics::record_decision(SkipReason::NotFoundAtSource.decision());
            return TransferOutcome::Skipped(SkipReason::NotFoundAtSource);
        }
        Err(TransferError::Exhausted(_)) => {
            metrics::record_decision("failed");
            return TransferOutcome::Failed;
        }
    };

    let len = bytes.len() as u64;
    match transfer.store(dst, id, bytes).await {
        Ok(()) => {
            metrics::record_bytes_copied(len);
            metrics::record_decision("copied");
            TransferOutcome::Copied { bytes: len }
        }
        Err(_) => {
            metrics::record_decision("failed");
            TransferOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objstorage::InMemoryObjStorage;
    use crate::record::{ObjectId, ObjectStatus};

    fn id(byte: u8) -> ObjectId {
        [byte; 20]
    }

    fn content_batch(records: Vec<ContentRecord>) -> RecordBatch {
        let mut batch = RecordBatch::new();
        batch.insert("content".to_string(), records);
        batch
    }

    async fn seeded_stores(count: u8) -> (Arc<InMemoryObjStorage>, Arc<InMemoryObjStorage>) {
        let src = Arc::new(InMemoryObjStorage::new());
        let dst = Arc::new(InMemoryObjStorage::new());
        for i in 0..count {
            src.add(id(i), format!("object-{}", i).into_bytes())
                .await
                .unwrap();
        }
        (src, dst)
    }

    #[tokio::test]
    async fn test_copies_visible_records() {
        let (src, dst) = seeded_stores(3).await;
        let replayer =
            ContentReplayer::new(src, Arc::clone(&dst) as _, ReplayConfig::for_testing());

        let records = (0..3).map(|i| ContentRecord::visible(id(i))).collect();
        let summary = replayer.replay(content_batch(records)).await.unwrap();

        assert_eq!(summary.stats.copied, 3);
        assert_eq!(summary.stats.failed, 0);
        assert_eq!(summary.stats.skipped(), 0);
        assert_eq!(dst.len().await, 3);
    }

    #[tokio::test]
    async fn test_hidden_records_skip_without_io() {
        let src = Arc::new(InMemoryObjStorage::new()); // empty: I/O would fail
        let dst = Arc::new(InMemoryObjStorage::new());
        let replayer =
            ContentReplayer::new(src, Arc::clone(&dst) as _, ReplayConfig::for_testing());

        let records = vec![
            ContentRecord::with_status(id(1), ObjectStatus::Hidden),
            ContentRecord::with_status(id(2), ObjectStatus::Absent),
        ];
        let summary = replayer.replay(content_batch(records)).await.unwrap();

        assert_eq!(summary.stats.skipped_invisible, 2);
        assert_eq!(summary.stats.failed, 0);
        assert!(dst.is_empty().await);
    }

    #[tokio::test]
    async fn test_exclusion_predicate_skips_without_io() {
        let src = Arc::new(InMemoryObjStorage::new()); // empty: I/O would fail
        let dst = Arc::new(InMemoryObjStorage::new());
        let excluded = id(1);
        let replayer =
            ContentReplayer::new(src, Arc::clone(&dst) as _, ReplayConfig::for_testing())
                .with_exclusion(Arc::new(move |r: &ContentRecord| r.sha1 == excluded));

        let summary = replayer
            .replay(content_batch(vec![ContentRecord::visible(id(1))]))
            .await
            .unwrap();

        assert_eq!(summary.stats.skipped_excluded, 1);
        assert!(dst.is_empty().await);
    }

    #[tokio::test]
    async fn test_already_present_skipped_when_check_dst() {
        let (src, dst) = seeded_stores(2).await;
        dst.add(id(0), b"object-0".to_vec()).await.unwrap();

        let replayer = ContentReplayer::new(
            src,
            Arc::clone(&dst) as _,
            ReplayConfig::for_testing(),
        );
        let records = vec![ContentRecord::visible(id(0)), ContentRecord::visible(id(1))];
        let summary = replayer.replay(content_batch(records)).await.unwrap();

        assert_eq!(summary.stats.skipped_already_present, 1);
        assert_eq!(summary.stats.copied, 1);
    }

    #[tokio::test]
    async fn test_check_dst_off_recopies() {
        let (src, dst) = seeded_stores(1).await;
        dst.add(id(0), b"object-0".to_vec()).await.unwrap();

        let mut config = ReplayConfig::for_testing();
        config.check_dst = false;
        let replayer = ContentReplayer::new(src, Arc::clone(&dst) as _, config);

        let summary = replayer
            .replay(content_batch(vec![ContentRecord::visible(id(0))]))
            .await
            .unwrap();

        // Never short-circuited to already-present
        assert_eq!(summary.stats.copied, 1);
        assert_eq!(summary.stats.skipped_already_present, 0);
    }

    #[tokio::test]
    async fn test_missing_at_source_is_a_skip_not_a_failure() {
        let src = Arc::new(InMemoryObjStorage::new());
        let dst = Arc::new(InMemoryObjStorage::new());
        let replayer = ContentReplayer::new(src, dst, ReplayConfig::for_testing());

        let summary = replayer
            .replay(content_batch(vec![ContentRecord::visible(id(9))]))
            .await
            .unwrap();

        assert_eq!(summary.stats.skipped_not_found, 1);
        assert_eq!(summary.stats.failed, 0);
    }

    #[tokio::test]
    async fn test_non_content_types_ignored() {
        let (src, dst) = seeded_stores(1).await;
        let replayer = ContentReplayer::new(src, dst, ReplayConfig::for_testing());

        let mut batch = content_batch(vec![ContentRecord::visible(id(0))]);
        batch.insert(
            "directory".to_string(),
            vec![ContentRecord::visible(id(0))],
        );

        let summary = replayer.replay(batch).await.unwrap();
        // Only the content record produced an outcome
        assert_eq!(summary.stats.total(), 1);
        assert_eq!(summary.stats.copied, 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let src = Arc::new(InMemoryObjStorage::new());
        let dst = Arc::new(InMemoryObjStorage::new());
        let replayer = ContentReplayer::new(src, dst, ReplayConfig::for_testing());

        let summary = replayer.replay(RecordBatch::new()).await.unwrap();
        assert_eq!(summary.stats.total(), 0);
    }

    #[tokio::test]
    async fn test_panicking_exclusion_is_a_defect() {
        let (src, dst) = seeded_stores(4).await;
        let boom = id(2);
        let replayer =
            ContentReplayer::new(src, Arc::clone(&dst) as _, ReplayConfig::for_testing())
                .with_exclusion(Arc::new(move |r: &ContentRecord| {
                    if r.sha1 == boom {
                        panic!("exclusion predicate defect");
                    }
                    false
                }));

        let records = (0..4).map(|i| ContentRecord::visible(id(i))).collect();
        let err = replayer.replay(content_batch(records)).await.unwrap_err();
        assert!(err.is_defect());

        // Already-spawned work drained before the abort: the other three
        // records were still copied.
        assert_eq!(dst.len().await, 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let src = Arc::new(InMemoryObjStorage::new());
        let dst = Arc::new(InMemoryObjStorage::new());
        let mut config = ReplayConfig::for_testing();
        config.concurrency = 0;
        let replayer = ContentReplayer::new(src, dst, config);

        let err = replayer.replay(RecordBatch::new()).await.unwrap_err();
        assert!(matches!(err, ReplayError::Config(_)));
    }

    #[tokio::test]
    async fn test_batch_stats_sum_to_total() {
        let (src, dst) = seeded_stores(6).await;
        dst.add(id(0), b"object-0".to_vec()).await.unwrap();

        let excluded = id(1);
        let replayer =
            ContentReplayer::new(src, Arc::clone(&dst) as _, ReplayConfig::for_testing())
                .with_exclusion(Arc::new(move |r: &ContentRecord| r.sha1 == excluded));

        let mut records: Vec<ContentRecord> =
            (0..6).map(|i| ContentRecord::visible(id(i))).collect();
        records.push(ContentRecord::with_status(id(7), ObjectStatus::Hidden));
        records.push(ContentRecord::visible(id(8))); // not in src

        let summary = replayer.replay(content_batch(records)).await.unwrap();
        let stats = summary.stats;
        assert_eq!(stats.total(), 8);
        assert_eq!(
            stats.copied + stats.failed + stats.skipped(),
            stats.total()
        );
        assert_eq!(stats.skipped_already_present, 1);
        assert_eq!(stats.skipped_excluded, 1);
        assert_eq!(stats.skipped_invisible, 1);
        assert_eq!(stats.skipped_not_found, 1);
        assert_eq!(stats.copied, 4);
    }

    #[tokio::test]
    async fn test_bytes_accumulate() {
        let src = Arc::new(InMemoryObjStorage::new());
        let dst = Arc::new(InMemoryObjStorage::new());
        src.add(id(0), vec![0u8; 100]).await.unwrap();
        src.add(id(1), vec![0u8; 28]).await.unwrap();

        let replayer = ContentReplayer::new(src, dst, ReplayConfig::for_testing());
        let records = vec![ContentRecord::visible(id(0)), ContentRecord::visible(id(1))];
        let summary = replayer.replay(content_batch(records)).await.unwrap();

        assert_eq!(summary.stats.bytes, 128);
    }

    #[tokio::test]
    async fn test_more_records_than_workers() {
        let src = Arc::new(InMemoryObjStorage::new());
        let dst = Arc::new(InMemoryObjStorage::new());
        for i in 0..50u8 {
            src.add(id(i), vec![i]).await.unwrap();
        }

        let mut config = ReplayConfig::for_testing();
        config.concurrency = 3; // far fewer slots than records
        let replayer = ContentReplayer::new(src, Arc::clone(&dst) as _, config);

        let records = (0..50).map(|i| ContentRecord::visible(id(i))).collect();
        let summary = replayer.replay(content_batch(records)).await.unwrap();

        assert_eq!(summary.stats.copied, 50);
        assert_eq!(dst.len().await, 50);
    }

    #[test]
    fn test_skip_reason_decisions() {
        assert_eq!(SkipReason::Invisible.decision(), "skipped");
        assert_eq!(SkipReason::Excluded.decision(), "excluded");
        assert_eq!(SkipReason::AlreadyPresent.decision(), "in_dst");
        assert_eq!(SkipReason::NotFoundAtSource.decision(), "not_in_src");
    }

    #[test]
    fn test_summary_throughput_zero_elapsed() {
        let summary = BatchSummary {
            stats: BatchStats::default(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(summary.objects_per_sec(), 0.0);
        assert_eq!(summary.mbytes_per_sec(), 0.0);
    }

    #[test]
    fn test_summary_throughput() {
        let mut stats = BatchStats::default();
        stats.copied = 10;
        stats.bytes = 10 * 1024 * 1024;
        let summary = BatchSummary {
            stats,
            elapsed: Duration::from_secs(2),
        };
        assert!((summary.objects_per_sec() - 5.0).abs() < f64::EPSILON);
        assert!((summary.mbytes_per_sec() - 5.0).abs() < f64::EPSILON);
    }
}
