//! Configuration builders controlling merge training.

use serde::{Deserialize, Serialize};

use crate::alphabet::Alphabet;
use crate::error::{KbpeError, Result};

/// Configuration for k-mer BPE training.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainerConfig {
    /// Width of the sliding k-mer window.
    pub kmer_size: usize,
    /// Symbol set sequences are validated against and the base vocabulary is
    /// enumerated over.
    pub alphabet: Alphabet,
    /// Assign base ids to every tuple length `1..=kmer_size` instead of only
    /// full-width k-mers.
    pub continuous: bool,
    /// Enables per-round logging through the `log` facade.
    pub show_progress: bool,
    /// Number of consecutive failed rounds that invalidate no new pairs
    /// tolerated before a merge inconsistency becomes a fatal training error.
    /// Failed rounds that do invalidate fresh pairs retry freely; the growing
    /// invalidated set bounds them.
    pub max_round_retries: usize,
    /// Hard cap on merge rounds; `None` runs until the budget or the pair
    /// supply is exhausted.
    pub max_rounds: Option<usize>,
}

impl TrainerConfig {
    /// Returns a builder initialised with [`TrainerConfig::default`].
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// Validates the invariants required for training.
    pub fn validate(&self) -> Result<()> {
        if self.kmer_size == 0 {
            return Err(KbpeError::InvalidConfig(
                "kmer_size must be at least 1".into(),
            ));
        }
        if self.max_round_retries == 0 {
            return Err(KbpeError::InvalidConfig(
                "max_round_retries must be greater than zero".into(),
            ));
        }
        let base_len = if self.continuous {
            // sum of |A|^L for L in 1..=k
            (1..=self.kmer_size).try_fold(0usize, |acc, length| {
                self.alphabet
                    .len()
                    .checked_pow(length as u32)
                    .and_then(|n| acc.checked_add(n))
            })
        } else {
            self.alphabet.len().checked_pow(self.kmer_size as u32)
        };
        match base_len {
            Some(n) if n <= u32::MAX as usize => Ok(()),
            _ => Err(KbpeError::InvalidConfig(format!(
                "base vocabulary |alphabet|^k = {}^{} overflows the token id range",
                self.alphabet.len(),
                self.kmer_size
            ))),
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            kmer_size: 4,
            alphabet: Alphabet::dna(),
            continuous: false,
            show_progress: true,
            max_round_retries: 8,
            max_rounds: None,
        }
    }
}

/// Builder for [`TrainerConfig`].
#[derive(Debug, Default, Clone)]
pub struct TrainerBuilder {
    cfg: TrainerConfig,
}

impl TrainerBuilder {
    /// Creates a builder with [`TrainerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the k-mer window width.
    #[must_use]
    pub fn kmer_size(mut self, value: usize) -> Self {
        self.cfg.kmer_size = value;
        self
    }

    /// Sets the sequence alphabet.
    #[must_use]
    pub fn alphabet(mut self, alphabet: Alphabet) -> Self {
        self.cfg.alphabet = alphabet;
        self
    }

    /// Enables or disables the continuous (all lengths `1..=k`) base vocabulary.
    #[must_use]
    pub fn continuous(mut self, enabled: bool) -> Self {
        self.cfg.continuous = enabled;
        self
    }

    /// Enables or disables per-round logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Sets the failed-round retry cap.
    #[must_use]
    pub fn max_round_retries(mut self, value: usize) -> Self {
        self.cfg.max_round_retries = value;
        self
    }

    /// Sets a hard merge-round limit.
    #[must_use]
    pub fn max_rounds(mut self, value: Option<usize>) -> Self {
        self.cfg.max_rounds = value;
        self
    }

    /// Finalises the builder, returning a validated [`TrainerConfig`].
    pub fn build(self) -> Result<TrainerConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}
