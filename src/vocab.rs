//! Vocabulary types mapping token strings to integer ids and back.

use rustc_hash::FxHashMap;

use crate::alphabet::Alphabet;
use crate::error::{KbpeError, Result};

/// Token identifier used throughout the crate.
pub type TokenId = u32;
/// Adjacent-pair key encoded as `(left, right)` token identifiers.
pub type Pair = (TokenId, TokenId);

/// Id substituted for tokens that cannot be resolved at encode time.
///
/// Encoding is total: an out-of-vocabulary token becomes this id instead of
/// raising, which makes encode lossy for such content.  Callers that care can
/// count substitutions through [`crate::codec::Codec::encode_with_oov`].
pub const FALLBACK_TOKEN_ID: TokenId = 0;

/// Bidirectional token mapping: the deterministic base vocabulary plus merged
/// tokens appended during training.
///
/// Base ids are the lexicographic enumeration indices of all symbol tuples of
/// the configured k-mer size, so they are identical across runs without seeing
/// any data.  Merged ids are allocated contiguously starting at
/// [`Vocabulary::base_len`] in commit order.  The value only grows while a
/// trainer owns it exclusively; once loaded for inference it is read-only and
/// safe to share across threads.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    kmer_size: usize,
    base_tokens: Vec<String>,
    merged_tokens: Vec<String>,
    forward: FxHashMap<String, TokenId>,
}

impl Vocabulary {
    /// Builds the base vocabulary for `alphabet` and `kmer_size`.
    ///
    /// With `continuous` set, tuples of every length `1..=kmer_size` receive
    /// base ids; otherwise only full-width k-mers do.
    #[must_use]
    pub fn new(alphabet: &Alphabet, kmer_size: usize, continuous: bool) -> Self {
        let base_tokens = if continuous {
            alphabet.enumerate_kmers_continuous(kmer_size)
        } else {
            alphabet.enumerate_kmers(kmer_size)
        };
        let forward = base_tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), id as TokenId))
            .collect();
        Self {
            kmer_size,
            base_tokens,
            merged_tokens: Vec::new(),
            forward,
        }
    }

    /// Reassembles a vocabulary from persisted parts, validating the bijection.
    pub fn from_parts(
        kmer_size: usize,
        base_tokens: Vec<String>,
        merged_tokens: Vec<String>,
    ) -> Result<Self> {
        if kmer_size == 0 {
            return Err(KbpeError::CorruptData("kmer_size must be at least 1".into()));
        }
        if base_tokens.is_empty() {
            return Err(KbpeError::CorruptData("base vocabulary is empty".into()));
        }
        let mut forward =
            FxHashMap::with_capacity_and_hasher(base_tokens.len() + merged_tokens.len(), Default::default());
        for (id, token) in base_tokens.iter().chain(merged_tokens.iter()).enumerate() {
            if forward.insert(token.clone(), id as TokenId).is_some() {
                return Err(KbpeError::CorruptData(format!(
                    "token {token:?} maps to more than one id"
                )));
            }
        }
        Ok(Self {
            kmer_size,
            base_tokens,
            merged_tokens,
            forward,
        })
    }

    /// Returns the k-mer window width this vocabulary was built for.
    #[must_use]
    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    /// Returns the number of base (enumerated) tokens.
    #[must_use]
    pub fn base_len(&self) -> usize {
        self.base_tokens.len()
    }

    /// Returns the number of merged tokens committed so far.
    #[must_use]
    pub fn merged_len(&self) -> usize {
        self.merged_tokens.len()
    }

    /// Returns the total vocabulary size (base plus merged).
    #[must_use]
    pub fn len(&self) -> usize {
        self.base_tokens.len() + self.merged_tokens.len()
    }

    /// Returns `true` when the vocabulary holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base_tokens.is_empty() && self.merged_tokens.is_empty()
    }

    /// Returns the base token strings in id order.
    #[must_use]
    pub fn base_tokens(&self) -> &[String] {
        &self.base_tokens
    }

    /// Returns the merged token strings in id order (first id = `base_len()`).
    #[must_use]
    pub fn merged_tokens(&self) -> &[String] {
        &self.merged_tokens
    }

    /// Looks up the id of a token string across base and merged entries.
    #[must_use]
    pub fn token_id(&self, token: &str) -> Option<TokenId> {
        self.forward.get(token).copied()
    }

    /// Returns `true` when the token string is present in the vocabulary.
    #[must_use]
    pub fn contains_token(&self, token: &str) -> bool {
        self.forward.contains_key(token)
    }

    /// Looks up the token string for an id, covering base and merged ids.
    #[must_use]
    pub fn token_string(&self, id: TokenId) -> Option<&str> {
        let idx = id as usize;
        if idx < self.base_tokens.len() {
            return Some(&self.base_tokens[idx]);
        }
        self.merged_tokens
            .get(idx - self.base_tokens.len())
            .map(String::as_str)
    }

    /// Appends a merged token, allocating the next contiguous id.
    ///
    /// Callers must not push a string that already resolves to an id: the
    /// forward map would keep the earlier entry and persisting the vocabulary
    /// would fail bijection validation on load.  The trainer checks
    /// [`Vocabulary::contains_token`] before assigning a merge.
    pub fn push_merged(&mut self, token: String) -> TokenId {
        let id = self.len() as TokenId;
        self.forward.entry(token.clone()).or_insert(id);
        self.merged_tokens.push(token);
        id
    }

    /// Rolls merged entries back to `merged_len`, dropping later forward entries.
    ///
    /// Used by the trainer to undo a failed round before retrying it.
    pub fn truncate_merged(&mut self, merged_len: usize) {
        while self.merged_tokens.len() > merged_len {
            let id = (self.len() - 1) as TokenId;
            let token = self
                .merged_tokens
                .pop()
                .unwrap_or_default();
            if self.forward.get(&token) == Some(&id) {
                self.forward.remove(&token);
            }
        }
    }

    /// Derives the alphabet from the symbols present in the base vocabulary.
    pub fn alphabet(&self) -> Result<Alphabet> {
        Alphabet::new(
            self.base_tokens
                .iter()
                .flat_map(|token| token.bytes())
                .collect::<Vec<u8>>(),
        )
    }
}
