//! Sorted-hash exclusion filter.
//!
//! Tests whether a content hash belongs to a pre-sorted, fixed-width set of
//! excluded hashes via binary search. The set is a flat concatenation of
//! fixed-width records, sorted ascending by byte-lexicographic order.
//!
//! The filter works over any byte-addressable sequence: a `Vec<u8>` loaded
//! from a file, or a lazily paged memory-mapped region (anything that derefs
//! to `&[u8]`). Sets are typically loaded once per process lifetime and
//! queried per object.
//!
//! # Invariant
//!
//! The backing sequence must be sorted ascending or binary search is
//! unsound. The filter never re-sorts; callers must guarantee this.
//! Duplicates are harmless but wasteful.
//!
//! # Example
//!
//! ```rust
//! use objstore_replayer::exclusion::is_hash_in_sorted;
//!
//! let h1 = [1u8; 20];
//! let h2 = [2u8; 20];
//! let mut data = Vec::new();
//! data.extend_from_slice(&h1);
//! data.extend_from_slice(&h2);
//!
//! assert!(is_hash_in_sorted(&h1, &data, 2, 20).unwrap());
//! assert!(!is_hash_in_sorted(&[3u8; 20], &data, 2, 20).unwrap());
//! ```

use crate::error::{ReplayError, Result};
use crate::record::OBJ_ID_LEN;
use std::path::Path;

/// Check if `hash` is in `data`, a sorted concatenation of `count`
/// fixed-width hash records of `width` bytes each.
///
/// Classic dichotomy over `[left, right)` record indices: probe the
/// midpoint, narrow by comparison, compare the last candidate directly.
/// O(log count) comparisons of `width` bytes each, no allocation.
///
/// Fails with [`ReplayError::InvalidHashWidth`] if the probe's width does
/// not match `width`, and with [`ReplayError::ExclusionSet`] if `data` is
/// too short to hold `count` records.
pub fn is_hash_in_sorted(hash: &[u8], data: &[u8], count: usize, width: usize) -> Result<bool> {
    if width == 0 || hash.len() != width {
        return Err(ReplayError::InvalidHashWidth {
            expected: width,
            actual: hash.len(),
        });
    }
    // Checked so an absurd claimed geometry errors instead of overflowing
    if count.checked_mul(width).map_or(true, |needed| data.len() < needed) {
        return Err(ReplayError::ExclusionSet(format!(
            "backing sequence holds {} bytes, {} records of {} bytes expected",
            data.len(),
            count,
            width
        )));
    }
    if count == 0 {
        return Ok(false);
    }

    let record = |pos: usize| &data[pos * width..(pos + 1) * width];

    let mut left = 0;
    let mut right = count;
    while left < right - 1 {
        let middle = (left + right) / 2;
        let pivot = record(middle);
        if pivot == hash {
            return Ok(true);
        } else if pivot < hash {
            left = middle;
        } else {
            right = middle;
        }
    }
    Ok(record(left) == hash)
}

/// An owned exclusion set backed by a flat byte buffer.
///
/// Wraps [`is_hash_in_sorted`] with the record width and count fixed at
/// construction time.
#[derive(Debug)]
pub struct ExclusionSet {
    data: Vec<u8>,
    width: usize,
    count: usize,
}

impl ExclusionSet {
    /// Build a set from a flat concatenation of `width`-byte records.
    ///
    /// Validates only the structure (length divisible by width); sortedness
    /// remains the caller's contract.
    pub fn new(data: Vec<u8>, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(ReplayError::ExclusionSet(
                "record width must be nonzero".to_string(),
            ));
        }
        if data.len() % width != 0 {
            return Err(ReplayError::ExclusionSet(format!(
                "backing sequence of {} bytes is not a multiple of the {}-byte record width",
                data.len(),
                width
            )));
        }
        let count = data.len() / width;
        Ok(Self { data, width, count })
    }

    /// Load a set of standard-width ids from an already-sorted flat file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_width(path, OBJ_ID_LEN)
    }

    /// Load a set with an explicit record width.
    pub fn from_file_with_width(path: impl AsRef<Path>, width: usize) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            ReplayError::ExclusionSet(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::new(data, width)
    }

    /// Test membership of a hash.
    ///
    /// Fails with [`ReplayError::InvalidHashWidth`] if the probe's width
    /// does not match the set's record width.
    pub fn contains(&self, hash: &[u8]) -> Result<bool> {
        is_hash_in_sorted(hash, &self.data, self.count, self.width)
    }

    /// Number of records in the set.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if the set has no records.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Record width in bytes.
    pub fn width(&self) -> usize {
        self.width
    }
}
