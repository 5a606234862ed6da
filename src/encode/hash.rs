//! Feature hashing.
//!
//! A `(field, value)` pair is mapped to `probes` slots of a fixed-width vector.
//! Each probe uses a different seed, so two pairs that collide on one probe
//! rarely collide on all of them.

use std::collections::BTreeMap;
use xxhash_rust::xxh64::xxh64;

/// Base seed; probe `p` hashes with `BASE_SEED + p`.
const BASE_SEED: u64 = 0x5eed_f00d;

/// Slot indices for `(field, value)`, one per probe, each `< num_features`.
pub(crate) fn slots(field: &str, value: &str, probes: usize, num_features: usize) -> Vec<usize> {
    debug_assert!(num_features > 0);
    (0..probes as u64)
        .map(|p| {
            let field_hash = xxh64(field.as_bytes(), BASE_SEED.wrapping_add(p));
            let h = xxh64(value.as_bytes(), field_hash);
            (h % num_features as u64) as usize
        })
        .collect()
}

/// Lowercased alphanumeric tokens with their counts, in token order.
pub(crate) fn token_counts(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *counts.entry(token.to_lowercase()).or_insert(0) += 1;
    }
    counts
}
