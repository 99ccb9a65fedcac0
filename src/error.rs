// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the replay engine.
//!
//! Errors are split across two layers. The object-store boundary has its own
//! closed classification ([`StorageError`](crate::objstorage::StorageError)):
//! a distinguished not-found condition and a transient backend failure. This
//! module defines the engine-level [`ReplayError`], which is what escapes the
//! transfer and batch layers.
//!
//! # Error Categories
//!
//! | Error Type | Aborts batch | Description |
//! |--------------------|--------------|-----------------------------------------------|
//! | `RetriesExhausted` | No | One object failed after the full retry budget |
//! | `InvalidHashWidth` | No | Exclusion probe width does not match the set |
//! | `ExclusionSet` | No | Exclusion set file is structurally malformed |
//! | `Config` | Yes | Configuration invalid, rejected before any work |
//! | `Defect` | Yes | Programming error (panicked pipeline task) |
//!
//! Only a `Defect` or a `Config` error propagates out of
//! [`ContentReplayer::replay`](crate::ContentReplayer::replay) as a batch
//! failure; everything else is contained per object and surfaces in the
//! batch statistics instead.

use thiserror::Error;

/// Result type alias for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Errors that can occur while replaying objects.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// A storage operation on a single object failed after exhausting the
    /// retry budget.
    ///
    /// The failure has already been logged and handed to the error reporter
    /// by the time this is constructed. The decision pipeline converts it
    /// into a `failed` outcome; it never aborts the batch.
    #[error("operation {operation} on {obj_id} failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        operation: String,
        obj_id: String,
        attempts: usize,
        message: String,
    },

    /// An exclusion-set probe used a hash of the wrong width.
    ///
    /// Binary search over fixed-width records is only sound when the probe
    /// matches the record width, so this is rejected up front.
    #[error("hash width mismatch: set records are {expected} bytes, probe is {actual} bytes")]
    InvalidHashWidth { expected: usize, actual: usize },

    /// The exclusion set's backing bytes are structurally invalid
    /// (truncated, not a multiple of the record width, or unreadable).
    #[error("exclusion set error: {0}")]
    ExclusionSet(String),

    /// Invalid configuration, rejected before any record is processed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A programming error inside the engine, most commonly a panicked
    /// pipeline task. Aborts the batch after in-flight work drains.
    #[error("defect: {0}")]
    Defect(String),
}

impl ReplayError {
    /// Check whether this error aborts the whole batch.
    ///
    /// Everything except a defect is contained within the object (or the
    /// call) that produced it.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Defect(_))
    }
}
