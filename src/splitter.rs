//! Overlapping k-mer window splitting.

use rayon::prelude::*;

use crate::alphabet::Alphabet;
use crate::error::{KbpeError, Result};
use crate::stats::worker_count;

/// Chunks below this size are split serially; the rayon fan-out only pays off
/// on long sequences.
const PARALLEL_THRESHOLD: usize = 64 * 1024;

/// Splits `sequence` into overlapping windows of width `k`.
///
/// The input is uppercased and validated against `alphabet` first; any foreign
/// character fails with [`KbpeError::InvalidSymbol`].  Windows start at every
/// position `0..=len - k`, so consecutive tokens share `k - 1` characters.
/// When `len % k` is nonzero one extra trailing token carries the last
/// `len % k` characters, capturing content a non-overlapping downstream
/// consumer would otherwise drop at the tail.
///
/// Splitting a chunk of windows only reads `k - 1` characters past the chunk
/// boundary, so chunks are processed in parallel and concatenated in input
/// order.
pub fn split(sequence: &str, alphabet: &Alphabet, k: usize) -> Result<Vec<String>> {
    if k == 0 {
        return Err(KbpeError::InvalidConfig("k-mer size must be at least 1".into()));
    }
    let upper = sequence.to_ascii_uppercase();
    alphabet.validate(&upper)?;

    let len = upper.len();
    let mut tokens = if len >= k {
        let total = len - k + 1;
        if total < PARALLEL_THRESHOLD {
            windows(&upper, 0, total, k)
        } else {
            let chunk = total.div_ceil(worker_count()).max(1);
            let starts: Vec<usize> = (0..total).step_by(chunk).collect();
            starts
                .par_iter()
                .flat_map_iter(|&start| {
                    let end = (start + chunk).min(total);
                    windows(&upper, start, end, k)
                })
                .collect()
        }
    } else {
        Vec::new()
    };

    let remainder = len % k;
    if remainder != 0 {
        tokens.push(upper[len - remainder..].to_string());
    }
    Ok(tokens)
}

fn windows(sequence: &str, start: usize, end: usize, k: usize) -> Vec<String> {
    (start..end).map(|i| sequence[i..i + k].to_string()).collect()
}

/// Reassembles a sequence from overlapping windows: the first character of
/// every token followed by the tail of the last token.
///
/// This is the window-overlap identity: for a sequence whose split produced no
/// trailing remainder token, `reassemble(&split(s)?) == s`.
#[must_use]
pub fn reassemble(tokens: &[String]) -> String {
    let Some(last) = tokens.last() else {
        return String::new();
    };
    let mut out: String = tokens
        .iter()
        .filter_map(|token| token.chars().next())
        .collect();
    out.push_str(last.get(1..).unwrap_or(""));
    out
}
