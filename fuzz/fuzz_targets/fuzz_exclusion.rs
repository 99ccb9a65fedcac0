//! Fuzz target for the sorted-hash membership search.
//!
//! This tests that `is_hash_in_sorted` never panics on arbitrary input:
//! any probe, any backing array, any claimed count and width must produce
//! Ok or Err, never an out-of-bounds access or overflow.

#![no_main]

use libfuzzer_sys::fuzz_target;
use objstore_replayer::exclusion::is_hash_in_sorted;

fuzz_target!(|input: (&[u8], &[u8], usize, u8)| {
    let (probe, data, count, width) = input;

    // Should never panic, whatever the claimed geometry
    let _ = is_hash_in_sorted(probe, data, count, width as usize);

    // A geometry consistent with the data must answer without error
    let width = probe.len();
    if width > 0 && data.len() % width == 0 {
        let count = data.len() / width;
        let _ = is_hash_in_sorted(probe, data, count, width).unwrap();
    }
});
