//! Vocabulary persistence: a human-inspectable JSON form and a compact
//! binary form, selected by file extension on load.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KbpeError, Result};
use crate::vocab::{TokenId, Vocabulary};

/// On-disk representation selected by the caller at save time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabFormat {
    /// Pretty-printed JSON, extension `.json`.
    Json,
    /// Compact bincode encoding, extension `.model`.
    Binary,
}

impl VocabFormat {
    /// Conventional file extension for the format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "model",
        }
    }

    /// Determines the format from a path's extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("model") => Ok(Self::Binary),
            _ => Err(KbpeError::UnsupportedFormat(
                path.as_ref().display().to_string(),
            )),
        }
    }
}

/// Persisted fields shared by both formats.
///
/// `base_vocab` maps token strings to ids, `merged_vocab` maps ids to token
/// strings; both directions are revalidated as a bijection on load.
#[derive(Debug, Serialize, Deserialize)]
struct VocabFile {
    kmer_size: usize,
    init_vocab_size: usize,
    base_vocab: BTreeMap<String, TokenId>,
    merged_vocab: BTreeMap<TokenId, String>,
}

impl VocabFile {
    fn from_vocabulary(vocab: &Vocabulary) -> Self {
        let base_vocab = vocab
            .base_tokens()
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), id as TokenId))
            .collect();
        let base_len = vocab.base_len() as TokenId;
        let merged_vocab = vocab
            .merged_tokens()
            .iter()
            .enumerate()
            .map(|(offset, token)| (base_len + offset as TokenId, token.clone()))
            .collect();
        Self {
            kmer_size: vocab.kmer_size(),
            init_vocab_size: vocab.base_len(),
            base_vocab,
            merged_vocab,
        }
    }

    fn into_vocabulary(self) -> Result<Vocabulary> {
        if self.base_vocab.len() != self.init_vocab_size {
            return Err(KbpeError::CorruptData(format!(
                "init_vocab_size is {} but base_vocab holds {} entries",
                self.init_vocab_size,
                self.base_vocab.len()
            )));
        }

        let mut base_tokens: Vec<Option<String>> = vec![None; self.init_vocab_size];
        for (token, id) in self.base_vocab {
            let slot = base_tokens.get_mut(id as usize).ok_or_else(|| {
                KbpeError::CorruptData(format!(
                    "base id {id} is outside 0..{}",
                    self.init_vocab_size
                ))
            })?;
            if slot.replace(token).is_some() {
                return Err(KbpeError::CorruptData(format!(
                    "base id {id} is assigned to more than one token"
                )));
            }
        }
        let base_tokens: Vec<String> = base_tokens
            .into_iter()
            .enumerate()
            .map(|(id, slot)| {
                slot.ok_or_else(|| KbpeError::CorruptData(format!("base id {id} is missing")))
            })
            .collect::<Result<_>>()?;

        let mut merged_tokens = Vec::with_capacity(self.merged_vocab.len());
        let mut expected = self.init_vocab_size as TokenId;
        for (id, token) in self.merged_vocab {
            if id != expected {
                return Err(KbpeError::CorruptData(format!(
                    "merged ids must be contiguous: expected {expected}, found {id}"
                )));
            }
            merged_tokens.push(token);
            expected += 1;
        }

        Vocabulary::from_parts(self.kmer_size, base_tokens, merged_tokens)
    }
}

/// Persists the vocabulary to `path` in the requested format.
pub fn save<P: AsRef<Path>>(vocab: &Vocabulary, path: P, format: VocabFormat) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|err| KbpeError::io(err, Some(path.to_path_buf())))?;
    let writer = BufWriter::new(file);
    let data = VocabFile::from_vocabulary(vocab);
    match format {
        VocabFormat::Json => serde_json::to_writer_pretty(writer, &data)?,
        VocabFormat::Binary => bincode::serialize_into(writer, &data)?,
    }
    Ok(())
}

/// Loads a vocabulary, dispatching on the path's extension.
///
/// Unsupported extensions fail with [`KbpeError::UnsupportedFormat`]; files
/// that parse but violate the documented structure (missing fields, broken
/// bijection, non-contiguous merged ids) fail with [`KbpeError::CorruptData`].
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vocabulary> {
    let path = path.as_ref();
    let format = VocabFormat::from_path(path)?;
    let file = File::open(path).map_err(|err| KbpeError::io(err, Some(path.to_path_buf())))?;
    let reader = BufReader::new(file);
    let data: VocabFile = match format {
        VocabFormat::Json => serde_json::from_reader(reader)
            .map_err(|err| KbpeError::CorruptData(err.to_string()))?,
        VocabFormat::Binary => bincode::deserialize_from(reader)
            .map_err(|err| KbpeError::CorruptData(err.to_string()))?,
    };
    data.into_vocabulary()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use std::fs;
    use tempfile::tempdir;

    fn sample_vocab() -> Vocabulary {
        let mut vocab = Vocabulary::new(&Alphabet::dna(), 2, false);
        vocab.push_merged("ACCG".into());
        vocab.push_merged("CGGT".into());
        vocab
    }

    #[test]
    fn json_round_trip_preserves_all_maps() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.json");
        let vocab = sample_vocab();
        save(&vocab, &path, VocabFormat::Json).expect("save");
        let loaded = load(&path).expect("load");
        assert_eq!(loaded.kmer_size(), vocab.kmer_size());
        assert_eq!(loaded.base_tokens(), vocab.base_tokens());
        assert_eq!(loaded.merged_tokens(), vocab.merged_tokens());
        assert_eq!(loaded.token_id("ACCG"), Some(16));
    }

    #[test]
    fn binary_round_trip_preserves_all_maps() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.model");
        let vocab = sample_vocab();
        save(&vocab, &path, VocabFormat::Binary).expect("save");
        let loaded = load(&path).expect("load");
        assert_eq!(loaded.base_tokens(), vocab.base_tokens());
        assert_eq!(loaded.merged_tokens(), vocab.merged_tokens());
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = load("vocab.txt").expect_err("txt is unsupported");
        assert!(matches!(err, KbpeError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_fields_are_corrupt() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.json");
        fs::write(&path, r#"{"kmer_size": 2}"#).expect("write");
        let err = load(&path).expect_err("missing fields");
        assert!(matches!(err, KbpeError::CorruptData(_)));
    }

    #[test]
    fn inconsistent_init_vocab_size_is_corrupt() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.json");
        fs::write(
            &path,
            r#"{"kmer_size": 1, "init_vocab_size": 3,
                "base_vocab": {"A": 0, "C": 1}, "merged_vocab": {}}"#,
        )
        .expect("write");
        let err = load(&path).expect_err("size mismatch");
        assert!(matches!(err, KbpeError::CorruptData(_)));
    }

    #[test]
    fn non_contiguous_merged_ids_are_corrupt() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.json");
        fs::write(
            &path,
            r#"{"kmer_size": 1, "init_vocab_size": 2,
                "base_vocab": {"A": 0, "C": 1},
                "merged_vocab": {"5": "AC"}}"#,
        )
        .expect("write");
        let err = load(&path).expect_err("gap in merged ids");
        assert!(matches!(err, KbpeError::CorruptData(_)));
    }

    #[test]
    fn duplicate_base_ids_are_corrupt() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.json");
        fs::write(
            &path,
            r#"{"kmer_size": 1, "init_vocab_size": 2,
                "base_vocab": {"A": 0, "C": 0}, "merged_vocab": {}}"#,
        )
        .expect("write");
        let err = load(&path).expect_err("two tokens on one id");
        assert!(matches!(err, KbpeError::CorruptData(_)));
    }
}
