//! Object records as delivered by the event stream.
//!
//! One [`ContentRecord`] describes an object that now exists at the source:
//! its content hash, declared length, and visibility status. Records are
//! immutable; the decision pipeline borrows one for the duration of a single
//! invocation and never retains it.
//!
//! The event stream delivers records grouped by object-type name
//! (`{"content": [record, ...]}`); only the `content` type is replayed.

use serde::{Deserialize, Serialize};

/// Width of an object id in bytes (SHA1).
pub const OBJ_ID_LEN: usize = 20;

/// Fixed-width content hash identifying an object's bytes.
///
/// Total ordering is byte-lexicographic, which is what exclusion sets
/// rely on for binary search.
pub type ObjectId = [u8; OBJ_ID_LEN];

/// Render an object id as lowercase hex for logs and reporter keys.
pub fn obj_hex(id: &ObjectId) -> String {
    hex::encode(id)
}

/// Visibility status of an object record.
///
/// Anything that is not `Visible` is skipped without any storage I/O.
/// Unknown status strings must deserialize rather than fail the batch,
/// hence the `Unknown` catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStatus {
    Visible,
    Hidden,
    Absent,
    #[serde(other)]
    Unknown,
}

impl ObjectStatus {
    /// Status name used in logs and metric tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::Absent => "absent",
            Self::Unknown => "unknown",
        }
    }
}

/// One entry from the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Content hash of the object; primary key throughout.
    pub sha1: ObjectId,

    /// Declared length in bytes, when the stream carries it.
    #[serde(default)]
    pub length: Option<u64>,

    /// Visibility status. Only `visible` objects are copied.
    pub status: ObjectStatus,
}

impl ContentRecord {
    /// Construct a visible record (the common case in tests).
    pub fn visible(sha1: ObjectId) -> Self {
        Self {
            sha1,
            length: None,
            status: ObjectStatus::Visible,
        }
    }

    /// Construct a record with an explicit status.
    pub fn with_status(sha1: ObjectId, status: ObjectStatus) -> Self {
        Self {
            sha1,
            length: None,
            status,
        }
    }

    /// Whether this record should be considered for copying at all.
    pub fn is_visible(&self) -> bool {
        self.status == ObjectStatus::Visible
    }
}
