//! Metrics describing the evolution of the training process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reason a training run terminated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The requested target vocabulary size was reached.
    TargetVocabReached,
    /// The configured maximum number of merge rounds was reached.
    MaxRoundsReached,
    /// No candidate pairs remained after filtering invalidated ones.
    NoEligiblePairs,
}

/// Metrics captured for each committed merge round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundMetrics {
    /// Sequential round number (1-indexed), counting committed rounds only.
    pub round: usize,
    /// Highest pair frequency observed during the round.
    pub best_frequency: u64,
    /// Number of new vocabulary entries committed by the round.
    pub merges_assigned: usize,
    /// Number of stream positions rewritten to merged ids.
    pub merges_applied: u64,
    /// Count of distinct pairs observed before selection.
    pub distinct_pairs: usize,
    /// Size of the invalidated-pair set at the end of the round.
    pub invalidated_pairs: usize,
    /// Execution time for the round, including any failed retries.
    pub elapsed_round: Duration,
    /// Total time elapsed since training started.
    pub elapsed_total: Duration,
    /// Resident set size sample captured from `/proc/self/status` on Linux.
    pub rss_kb: Option<usize>,
}

/// Aggregate metrics produced by a training session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingMetrics {
    /// Per-round snapshots accrued during training.
    pub rounds: Vec<RoundMetrics>,
    /// Total duration of the training session.
    pub total_duration: Duration,
    /// Reason training terminated.
    pub stop_reason: StopReason,
    /// Total number of merged tokens committed to the vocabulary.
    pub merge_count: usize,
}

impl TrainingMetrics {
    /// Creates an empty metrics container with pre-allocated capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            rounds: Vec::with_capacity(capacity),
            total_duration: Duration::ZERO,
            stop_reason: StopReason::TargetVocabReached,
            merge_count: 0,
        }
    }
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open("/proc/self/status").ok()?;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let value = rest
                .split_whitespace()
                .find_map(|part| part.parse::<usize>().ok());
            return value;
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the current resident set size (RSS) on supported platforms.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}
