// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable reporting of permanently failed transfers.
//!
//! When a transfer exhausts its retry budget the engine hands a
//! [`FailureContext`] to the configured [`ErrorReporter`], which records it
//! keyed by the object's content hash so the failure can be inspected or
//! replayed offline without re-consuming the event stream.
//!
//! The default reporter is a no-op: the structured log already captured the
//! failure. A durable sink is any key-value store accepting
//! `put(key, serialized-context)`; records for the same object overwrite
//! each other, so the sink stays idempotent under redelivery.
//!
//! Reporting is infallible at this boundary. A sink that can fail must log
//! and swallow internally; a reporter error must never turn an object
//! failure into a batch failure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::Mutex;

/// Type alias for the boxed futures returned by [`ErrorReporter::report`].
pub type ReportFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Everything needed to retry a failed transfer offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Hex-encoded content hash of the failing object.
    pub obj_id: String,
    /// Storage operation that failed (`get`, `put`, `contains`).
    pub operation: String,
    /// Human-readable description of the last underlying error.
    pub error: String,
    /// Number of attempts made before giving up.
    pub retries: usize,
}

impl FailureContext {
    /// Stable sink key for this object: `blob:<hex sha1>`.
    ///
    /// Derived from the hash only, so a later failure of the same object
    /// overwrites the earlier record.
    pub fn key(&self) -> String {
        format!("blob:{}", self.obj_id)
    }

    /// Serialized payload for the durable sink.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a struct of strings and an integer cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Sink recording permanently failed transfers.
///
/// Must be safe to call concurrently from many pipeline invocations.
pub trait ErrorReporter: Send + Sync + 'static {
    /// Record one failed object, overwriting any prior record for the
    /// same object.
    fn report(&self, ctx: FailureContext) -> ReportFuture<'_>;
}

/// Default reporter: drop the record, logging already captured it.
#[derive(Debug, Clone, Default)]
pub struct NoOpReporter;

impl ErrorReporter for NoOpReporter {
    fn report(&self, ctx: FailureContext) -> ReportFuture<'_> {
        Box::pin(async move {
            tracing::trace!(key = %ctx.key(), "no error reporter configured, dropping record");
        })
    }
}

/// In-memory reporter used in tests and as the reference semantics for a
/// durable sink: one record per key, last write wins.
#[derive(Default)]
pub struct InMemoryReporter {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the serialized record for a key, if any.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.records.lock().await.get(key).cloned()
    }

    /// Number of distinct failed objects recorded.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Check whether nothing has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// All recorded keys, unordered.
    pub async fn keys(&self) -> Vec<String> {
        self.records.lock().await.keys().cloned().collect()
    }
}

impl ErrorReporter for InMemoryReporter {
    fn report(&self, ctx: FailureContext) -> ReportFuture<'_> {
        Box::pin(async move {
            self.records
                .lock()
                .await
                .insert(ctx.key(), ctx.to_bytes());
        })
    }
}
