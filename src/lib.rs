//! # Object-Store Replayer
//!
//! A replication engine copying content-addressable objects from a source
//! object store to a destination, driven by batches of change records from
//! an event stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          objstore-replayer                           │
//! │                                                                      │
//! │  ┌──────────────┐    ┌──────────────────┐    ┌───────────────────┐   │
//! │  │ RecordBatch  │───►│ ContentReplayer  │───►│ TransferClient    │   │
//! │  │ (per type)   │    │ (decision        │    │ (retry + backoff  │   │
//! │  └──────────────┘    │  pipeline)       │    │  per operation)   │   │
//! │                      └──────────────────┘    └───────────────────┘   │
//! │                            │        │                  │             │
//! │                            ▼        ▼                  ▼             │
//! │                   ┌──────────────┐ ┌──────────┐ ┌───────────────┐    │
//! │                   │ ExclusionSet │ │ Bulkhead │ │ ErrorReporter │    │
//! │                   │ (sorted      │ │ (worker  │ │ (durable      │    │
//! │                   │  hashes)     │ │  slots)  │ │  failures)    │    │
//! │                   └──────────────┘ └──────────┘ └───────────────┘    │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decision pipeline
//!
//! Every `content` record flows through cheap checks first: visibility,
//! exclusion, destination presence. Only objects surviving all three are
//! fetched from the source and stored at the destination. Storage
//! operations retry with full-jitter exponential backoff; an exhausted
//! budget marks the object failed, hands it to the error reporter, and
//! never aborts the batch.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use objstore_replayer::{ContentReplayer, InMemoryObjStorage, ReplayConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let src = Arc::new(InMemoryObjStorage::new());
//!     let dst = Arc::new(InMemoryObjStorage::new());
//!     let replayer = ContentReplayer::new(src, dst, ReplayConfig::default());
//!
//!     // One call per delivered batch; acknowledge on Ok.
//!     let batch = Default::default();
//!     let summary = replayer.replay(batch).await.expect("batch defect");
//!     println!("copied {} objects", summary.stats.copied);
//! }
//! ```

pub mod config;
pub mod error;
pub mod exclusion;
pub mod metrics;
pub mod objstorage;
pub mod record;
pub mod replay;
pub mod reporter;
pub mod resilience;
pub mod transfer;
pub mod watchdog;

// Re-exports for convenience
pub use config::{ReplayConfig, RetryMetricPolicy};
pub use error::{ReplayError, Result};
pub use exclusion::ExclusionSet;
pub use objstorage::{InMemoryObjStorage, ObjStorage, StorageError};
pub use record::{ContentRecord, ObjectId, ObjectStatus, OBJ_ID_LEN};
pub use replay::{BatchStats, BatchSummary, ContentReplayer, RecordBatch, SkipReason, TransferOutcome};
pub use reporter::{ErrorReporter, FailureContext, InMemoryReporter, NoOpReporter};
pub use resilience::{Bulkhead, RetryConfig};
pub use transfer::{TransferClient, TransferError};
pub use watchdog::{NoOpWatchdog, Watchdog};
