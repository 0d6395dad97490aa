//! Duplicate-count redistribution.
//!
//! A sample can reach one `(position, allele)` entry through several
//! overlapping sub-regions, each contributing a partial count. After
//! redistribution every sample sits in exactly one bucket whose key is its
//! total copy count.

use std::collections::{BTreeMap, BTreeSet};

use super::position::CountBuckets;
use crate::region::SampleId;

/// Move repeated sample ids into the bucket matching their total count.
///
/// Positive buckets are processed in ascending order. A sample listed
/// `n + 1` times in bucket `c` moves to bucket `c * (n + 1)`; a sample
/// already settled in an earlier bucket `b` moves to `b + c`. Buckets
/// created on the way are queued and processed in order. Non-positive
/// buckets hold reserved encodings and are only deduplicated.
pub fn redistribute(buckets: &mut CountBuckets) {
    let mut pending: BTreeSet<i32> = buckets.keys().copied().filter(|&c| c > 0).collect();
    let mut settled: BTreeMap<SampleId, i32> = BTreeMap::new();
    let mut result = CountBuckets::new();

    for (&count, ids) in buckets.range(..=0) {
        let mut ids = ids.clone();
        ids.sort_unstable();
        ids.dedup();
        if !ids.is_empty() {
            result.insert(count, ids);
        }
    }

    while let Some(count) = pending.pop_first() {
        let ids = buckets.remove(&count).unwrap_or_default();
        let mut occurrences: BTreeMap<SampleId, i32> = BTreeMap::new();
        for id in ids {
            *occurrences.entry(id).or_insert(0) += 1;
        }

        for (id, times) in occurrences {
            let mut total = count * times;
            if let Some(previous) = settled.remove(&id) {
                if let Some(list) = result.get_mut(&previous) {
                    list.retain(|&other| other != id);
                }
                total += previous;
            }
            if total == count {
                result.entry(count).or_default().push(id);
                settled.insert(id, count);
            } else {
                buckets.entry(total).or_default().push(id);
                pending.insert(total);
            }
        }
    }

    result.retain(|_, ids| !ids.is_empty());
    for ids in result.values_mut() {
        ids.sort_unstable();
    }
    *buckets = result;
}
