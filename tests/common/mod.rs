//! Shared test utilities for integration and chaos tests.
//!
//! This module provides:
//! - A mock object store recording calls and injecting failures
//! - Record and batch construction helpers

pub mod mock_storage;

pub use mock_storage::*;

use objstore_replayer::record::{ContentRecord, ObjectId};
use objstore_replayer::replay::RecordBatch;

/// Deterministic 20-byte object id from a single byte.
pub fn obj_id(byte: u8) -> ObjectId {
    [byte; 20]
}

/// A batch holding a single `content` series.
pub fn content_batch(records: Vec<ContentRecord>) -> RecordBatch {
    let mut batch = RecordBatch::new();
    batch.insert("content".to_string(), records);
    batch
}

/// Visible records for ids `0..count`.
pub fn visible_records(count: u8) -> Vec<ContentRecord> {
    (0..count).map(|i| ContentRecord::visible(obj_id(i))).collect()
}
