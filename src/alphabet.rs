//! Symbol sets over which sequences and base vocabularies are defined.

use serde::{Deserialize, Serialize};

use crate::error::{KbpeError, Result};

/// Single-letter amino acid codes plus the gap symbol.
const PROTEIN_SYMBOLS: &[u8] = b"ARNDCQEGHILKMFPSTWYV-";

/// Ordered set of single-character symbols a sequence may contain.
///
/// Symbols are stored sorted and deduplicated so that enumerating the base
/// vocabulary is deterministic: two runs with the same symbols and k-mer size
/// always assign identical ids without looking at any data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alphabet {
    symbols: Vec<u8>,
}

impl Alphabet {
    /// Creates an alphabet from arbitrary ASCII symbols, sorting and deduplicating them.
    pub fn new<I>(symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut symbols: Vec<u8> = symbols.into_iter().collect();
        if let Some(&bad) = symbols.iter().find(|b| !b.is_ascii() || b.is_ascii_control()) {
            return Err(KbpeError::InvalidConfig(format!(
                "alphabet symbol {bad:#04x} is not printable ASCII"
            )));
        }
        symbols.sort_unstable();
        symbols.dedup();
        if symbols.is_empty() {
            return Err(KbpeError::InvalidConfig(
                "alphabet must contain at least one symbol".into(),
            ));
        }
        Ok(Self { symbols })
    }

    /// The four nucleotide bases `{A, C, G, T}`.
    #[must_use]
    pub fn dna() -> Self {
        Self {
            symbols: vec![b'A', b'C', b'G', b'T'],
        }
    }

    /// The twenty standard amino acids plus the gap symbol `-`.
    #[must_use]
    pub fn protein() -> Self {
        let mut symbols = PROTEIN_SYMBOLS.to_vec();
        symbols.sort_unstable();
        Self { symbols }
    }

    /// Returns the sorted symbol bytes.
    #[must_use]
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Returns the number of distinct symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` when the alphabet holds no symbols; never true for a constructed value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns `true` when `byte` is a member of the alphabet.
    #[must_use]
    pub fn contains(&self, byte: u8) -> bool {
        self.symbols.binary_search(&byte).is_ok()
    }

    /// Validates that every byte of `sequence` belongs to the alphabet.
    ///
    /// The caller is expected to have uppercased the sequence already; validation
    /// is byte-exact and reports the first offending position.
    pub fn validate(&self, sequence: &str) -> Result<()> {
        if let Some((position, &byte)) = sequence
            .as_bytes()
            .iter()
            .enumerate()
            .find(|(_, b)| !self.contains(**b))
        {
            return Err(KbpeError::InvalidSymbol {
                symbol: byte as char,
                position,
            });
        }
        Ok(())
    }

    /// Enumerates every ordered symbol tuple of length `k` in lexicographic order.
    ///
    /// The index of a k-mer in the returned list is its base-vocabulary id.
    #[must_use]
    pub fn enumerate_kmers(&self, k: usize) -> Vec<String> {
        let mut combos = vec![String::new()];
        for _ in 0..k {
            let mut next = Vec::with_capacity(combos.len() * self.symbols.len());
            for prefix in &combos {
                for &symbol in &self.symbols {
                    let mut kmer = String::with_capacity(prefix.len() + 1);
                    kmer.push_str(prefix);
                    kmer.push(symbol as char);
                    next.push(kmer);
                }
            }
            combos = next;
        }
        combos
    }

    /// Enumerates tuples of every length `1..=k`, shorter tuples first.
    ///
    /// Used by the `continuous` vocabulary mode where sub-k-mer fragments get
    /// their own base ids.
    #[must_use]
    pub fn enumerate_kmers_continuous(&self, k: usize) -> Vec<String> {
        let mut combos = Vec::new();
        for length in 1..=k {
            combos.extend(self.enumerate_kmers(length));
        }
        combos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dna_symbols_are_sorted() {
        assert_eq!(Alphabet::dna().symbols(), b"ACGT");
    }

    #[test]
    fn protein_has_twenty_one_symbols() {
        let alphabet = Alphabet::protein();
        assert_eq!(alphabet.len(), 21);
        assert!(alphabet.contains(b'-'));
        assert!(alphabet.contains(b'W'));
        assert!(!alphabet.contains(b'Z'));
    }

    #[test]
    fn custom_alphabet_deduplicates() {
        let alphabet = Alphabet::new(*b"TTGGCCAA").expect("valid alphabet");
        assert_eq!(alphabet.symbols(), b"ACGT");
    }

    #[test]
    fn empty_alphabet_is_rejected() {
        let err = Alphabet::new([]).expect_err("empty must fail");
        assert!(matches!(err, KbpeError::InvalidConfig(_)));
    }

    #[test]
    fn validate_reports_position() {
        let err = Alphabet::dna()
            .validate("ACGX")
            .expect_err("X is not a base");
        match err {
            KbpeError::InvalidSymbol { symbol, position } => {
                assert_eq!(symbol, 'X');
                assert_eq!(position, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn kmer_enumeration_is_lexicographic() {
        let kmers = Alphabet::dna().enumerate_kmers(2);
        assert_eq!(kmers.len(), 16);
        assert_eq!(kmers[0], "AA");
        assert_eq!(kmers[1], "AC");
        assert_eq!(kmers[6], "CG");
        assert_eq!(kmers[11], "GT");
        assert_eq!(kmers[15], "TT");
    }

    #[test]
    fn continuous_enumeration_includes_shorter_lengths() {
        let kmers = Alphabet::dna().enumerate_kmers_continuous(2);
        assert_eq!(kmers.len(), 4 + 16);
        assert_eq!(kmers[0], "A");
        assert_eq!(kmers[4], "AA");
    }
}
