//! Round-based merge training over k-mer token-id streams.

use std::time::Instant;

use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::TrainerConfig;
use crate::error::{KbpeError, Result};
use crate::metrics::{sample_rss_kb, RoundMetrics, StopReason, TrainingMetrics};
use crate::serialization::{self, VocabFormat};
use crate::splitter;
use crate::stats;
use crate::vocab::{Pair, TokenId, Vocabulary, FALLBACK_TOKEN_ID};

/// Pair-to-new-id mapping assigned within a single round and discarded after
/// its rewrite pass.
type MergeMap = FxHashMap<Pair, TokenId>;

/// Learns a merge vocabulary over overlapping k-mer streams.
///
/// The trainer owns its [`Vocabulary`] exclusively: chunked counting fans out
/// to workers, but pair selection, id assignment, and the rewrite pass run on
/// the single driver thread because assignment order determines id
/// allocation.
#[derive(Debug, Clone)]
pub struct Trainer {
    cfg: TrainerConfig,
    vocab: Vocabulary,
}

impl Trainer {
    /// Creates a trainer for the supplied configuration, building the base
    /// vocabulary up front.
    #[must_use]
    pub fn new(cfg: TrainerConfig) -> Self {
        let vocab = Vocabulary::new(&cfg.alphabet, cfg.kmer_size, cfg.continuous);
        Self { cfg, vocab }
    }

    /// Convenience constructor: DNA alphabet with the given k-mer size.
    pub fn with_kmer_size(kmer_size: usize) -> Result<Self> {
        let cfg = TrainerConfig::builder().kmer_size(kmer_size).build()?;
        Ok(Self::new(cfg))
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.cfg
    }

    /// Returns the vocabulary in its current (possibly partially trained) state.
    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Consumes the trainer, returning the owned vocabulary.
    #[must_use]
    pub fn into_vocabulary(self) -> Vocabulary {
        self.vocab
    }

    /// Persists the vocabulary to `path` in the requested format.
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P, format: VocabFormat) -> Result<()> {
        serialization::save(&self.vocab, path, format)
    }

    /// Learns merges from `sequence` until the vocabulary reaches
    /// `target_vocab_size` or no mergeable pairs remain.
    ///
    /// Each round counts adjacent pairs, selects up to `beam_width` of the most
    /// frequent ones (count descending, ties broken by ascending pair key),
    /// assigns them contiguous ids, and rewrites the stream in one
    /// left-to-right pass.  A selected pair that the rewrite never applies —
    /// an earlier merge in the same pass consumed its occurrences — fails the
    /// round: the round's vocabulary additions are rolled back, the pair is
    /// invalidated, and the round retries without consuming merge budget.
    /// The growing invalidated set bounds those retries; only a retry that
    /// invalidates nothing new counts against `max_round_retries`, beyond
    /// which training aborts with [`KbpeError::MergeInconsistency`].
    /// Stopping short of the target is a valid terminal state, reported via
    /// [`StopReason`], not an error.
    pub fn train(
        &mut self,
        sequence: &str,
        target_vocab_size: usize,
        beam_width: usize,
    ) -> Result<TrainingMetrics> {
        self.cfg.validate()?;
        if beam_width == 0 {
            return Err(KbpeError::InvalidConfig(
                "beam_width must be at least 1".into(),
            ));
        }
        let base_len = self.vocab.base_len();
        if target_vocab_size <= self.vocab.len() {
            return Err(KbpeError::InvalidConfig(format!(
                "target vocab size {target_vocab_size} leaves no room for merges \
                 (current vocabulary holds {} tokens)",
                self.vocab.len()
            )));
        }
        let budget = target_vocab_size - self.vocab.len();

        let tokens = splitter::split(sequence, &self.cfg.alphabet, self.cfg.kmer_size)?;
        let mut ids: Vec<TokenId> = tokens
            .iter()
            .map(|token| self.vocab.token_id(token).unwrap_or(FALLBACK_TOKEN_ID))
            .collect();
        if self.cfg.show_progress {
            info!(
                "training towards vocab {target_vocab_size} from {} k-mer tokens (budget {budget})",
                ids.len()
            );
        }

        let mut invalidated: FxHashSet<Pair> = FxHashSet::default();
        let mut metrics = TrainingMetrics::new(budget.div_ceil(beam_width).min(16_384));
        let mut merge_count = 0usize;
        let mut retry_budget = RetryBudget::new(self.cfg.max_round_retries);
        let mut round = 0usize;
        let training_start = Instant::now();
        let mut round_start = Instant::now();

        while merge_count < budget {
            if let Some(max_rounds) = self.cfg.max_rounds {
                if round >= max_rounds {
                    metrics.stop_reason = StopReason::MaxRoundsReached;
                    break;
                }
            }

            let mut counts = stats::count_pairs(&ids);
            for pair in &invalidated {
                counts.remove(pair);
            }
            let distinct_pairs = counts.len();

            let mut candidates: Vec<(Pair, u64)> =
                counts.iter().map(|(&pair, &count)| (pair, count)).collect();
            candidates.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            candidates.truncate(beam_width);

            let Some(&(_, best_frequency)) = candidates.first() else {
                if merge_count == 0 && round == 0 {
                    return Err(KbpeError::InvalidConfig(
                        "training sequence produces no mergeable pairs".into(),
                    ));
                }
                metrics.stop_reason = StopReason::NoEligiblePairs;
                break;
            };

            let merged_checkpoint = self.vocab.merged_len();
            let merge_map = assign_merges(
                &mut self.vocab,
                &candidates,
                budget - merge_count,
                &mut invalidated,
            );
            if merge_map.is_empty() {
                // Every candidate concatenated to an existing token; all of
                // them are invalidated now, so the next count skips past them.
                continue;
            }

            let (next_ids, applied) = rewrite(&ids, &merge_map);
            let failed: Vec<Pair> = merge_map
                .keys()
                .filter(|pair| applied.get(pair).copied().unwrap_or(0) == 0)
                .copied()
                .collect();
            if !failed.is_empty() {
                self.vocab.truncate_merged(merged_checkpoint);
                let mut newly_invalidated = 0usize;
                for pair in failed {
                    debug!("invalidating pair {pair:?}: selected but never applied");
                    if invalidated.insert(pair) {
                        newly_invalidated += 1;
                    }
                }
                retry_budget.register_failure(newly_invalidated, invalidated.len())?;
                continue;
            }
            retry_budget.reset();

            let merges_applied: u64 = applied.values().sum();
            merge_count += merge_map.len();
            ids = next_ids;
            round += 1;

            if self.cfg.show_progress {
                info!(
                    "round {:>5} freq {:>9} assigned {:>4} applied {:>8} distinct_pairs {:>8} vocab {:>8}",
                    round,
                    best_frequency,
                    merge_map.len(),
                    merges_applied,
                    distinct_pairs,
                    base_len + merge_count
                );
            }
            metrics.rounds.push(RoundMetrics {
                round,
                best_frequency,
                merges_assigned: merge_map.len(),
                merges_applied,
                distinct_pairs,
                invalidated_pairs: invalidated.len(),
                elapsed_round: round_start.elapsed(),
                elapsed_total: training_start.elapsed(),
                rss_kb: sample_rss_kb(),
            });
            round_start = Instant::now();
        }

        metrics.merge_count = merge_count;
        metrics.total_duration = training_start.elapsed();
        if self.cfg.show_progress {
            if merge_count < budget {
                warn!(
                    "stopped after {merge_count}/{budget} merges ({:?})",
                    metrics.stop_reason
                );
            }
            info!(
                "completed {merge_count} merges in {:.2?}; vocab size {}",
                metrics.total_duration,
                self.vocab.len()
            );
        }
        Ok(metrics)
    }
}

/// Bounds consecutive failed rounds that invalidate no new pairs.
///
/// A failed round that grows the invalidated set narrows the next selection,
/// so those retries terminate on their own; a failure that contributes no new
/// pair cannot be resolved by retrying and is counted against the cap.
#[derive(Debug)]
struct RetryBudget {
    cap: usize,
    stalled: usize,
}

impl RetryBudget {
    fn new(cap: usize) -> Self {
        Self { cap, stalled: 0 }
    }

    fn register_failure(&mut self, newly_invalidated: usize, invalidated_total: usize) -> Result<()> {
        if newly_invalidated > 0 {
            self.stalled = 0;
            return Ok(());
        }
        self.stalled += 1;
        if self.stalled > self.cap {
            return Err(KbpeError::MergeInconsistency(format!(
                "round failed {} consecutive times without invalidating new pairs \
                 ({invalidated_total} pairs invalidated so far)",
                self.stalled
            )));
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.stalled = 0;
    }
}

/// Assigns contiguous merged ids to the round's candidates, up to
/// `budget_left` of them.  A pair whose concatenation already resolves to an
/// existing token is invalidated instead of assigned: pushing the duplicate
/// string would produce a vocabulary that saves cleanly but fails bijection
/// validation on load.
fn assign_merges(
    vocab: &mut Vocabulary,
    candidates: &[(Pair, u64)],
    budget_left: usize,
    invalidated: &mut FxHashSet<Pair>,
) -> MergeMap {
    let mut merge_map = MergeMap::default();
    for &(pair, _) in candidates {
        if merge_map.len() >= budget_left {
            break;
        }
        let token = concat_pair(vocab, pair);
        if vocab.contains_token(&token) {
            debug!("invalidating pair {pair:?}: token {token:?} already in the vocabulary");
            invalidated.insert(pair);
            continue;
        }
        let new_id = vocab.push_merged(token);
        merge_map.insert(pair, new_id);
    }
    merge_map
}

/// Token string for a merged pair: the literal concatenation of both
/// constituents' strings, falling back to the raw id's decimal form for ids
/// with no known string (should not occur in normal operation).
fn concat_pair(vocab: &Vocabulary, pair: Pair) -> String {
    let mut token = match vocab.token_string(pair.0) {
        Some(s) => s.to_string(),
        None => pair.0.to_string(),
    };
    match vocab.token_string(pair.1) {
        Some(s) => token.push_str(s),
        None => token.push_str(&pair.1.to_string()),
    }
    token
}

/// Single left-to-right rewrite pass: at each position, a pair present in
/// `merge_map` emits its merged id and advances by two, anything else is
/// copied through.  Returns the rewritten stream and per-pair application
/// counts.
fn rewrite(ids: &[TokenId], merge_map: &MergeMap) -> (Vec<TokenId>, FxHashMap<Pair, u64>) {
    let mut out = Vec::with_capacity(ids.len());
    let mut applied: FxHashMap<Pair, u64> = FxHashMap::default();
    let mut i = 0;
    while i < ids.len() {
        if i + 1 < ids.len() {
            let pair = (ids[i], ids[i + 1]);
            if let Some(&new_id) = merge_map.get(&pair) {
                out.push(new_id);
                *applied.entry(pair).or_insert(0) += 1;
                i += 2;
                continue;
            }
        }
        out.push(ids[i]);
        i += 1;
    }
    (out, applied)
}
