//! Parallel adjacent-pair frequency statistics over token-id streams.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::vocab::{Pair, TokenId};

/// Frequency count per adjacent token-id pair.
pub type PairCount = FxHashMap<Pair, u64>;

/// Number of counting workers: available parallelism with a small margin
/// reserved for the driver, floored at one.
pub(crate) fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

/// Counts every adjacent `(ids[i], ids[i + 1])` pair in the stream.
///
/// The stream is partitioned into contiguous chunks, one per worker, with each
/// chunk extended by a single trailing id so the pair straddling a chunk
/// boundary is counted exactly once, by the chunk owning its first id.  The
/// reduction sums counts per key, so the result is independent of worker
/// scheduling order.
#[must_use]
pub fn count_pairs(ids: &[TokenId]) -> PairCount {
    count_pairs_chunked(ids, worker_count())
}

/// Chunked counting with an explicit worker count; `count_pairs` with
/// `workers = 1` degenerates to a single serial scan, which the test suite
/// uses as the reference result.
#[must_use]
pub fn count_pairs_chunked(ids: &[TokenId], workers: usize) -> PairCount {
    if ids.len() < 2 {
        return PairCount::default();
    }
    let chunk = ids.len().div_ceil(workers.max(1)).max(1);
    let starts: Vec<usize> = (0..ids.len()).step_by(chunk).collect();
    starts
        .par_iter()
        .map(|&start| {
            // One extra trailing id covers the boundary-straddling pair.
            let end = (start + chunk + 1).min(ids.len());
            let mut local = PairCount::default();
            for window in ids[start..end].windows(2) {
                *local.entry((window[0], window[1])).or_insert(0) += 1;
            }
            local
        })
        .reduce(PairCount::default, |mut acc, local| {
            for (pair, count) in local {
                *acc.entry(pair).or_insert(0) += count;
            }
            acc
        })
}
