//! Overlapping k-mer BPE tokenizer for biological sequences.
//!
//! The crate splits DNA or protein sequences into overlapping k-mer windows,
//! learns a byte-pair-merge vocabulary on top of the deterministic base
//! k-mer vocabulary, and encodes/decodes sequences against the result.
//! Typical usage trains a [`Trainer`], persists the vocabulary, and serves
//! encode/decode traffic through a shared [`Codec`].
//!
//! ```no_run
//! use kbpe::{Codec, Trainer, TrainerConfig, VocabFormat};
//!
//! # fn main() -> kbpe::Result<()> {
//! let cfg = TrainerConfig::builder()
//!     .kmer_size(4)
//!     .show_progress(false)
//!     .build()?;
//! let mut trainer = Trainer::new(cfg);
//! trainer.train("ACGTACGTAAGGTTACGT", 300, 10)?;
//! trainer.save("dna.json", VocabFormat::Json)?;
//!
//! let codec = Codec::from_path("dna.json")?;
//! let ids = codec.encode("ACGTACGT")?;
//! let sequence = codec.decode(&ids);
//! # Ok(())
//! # }
//! ```
//!
//! Encoding is total: out-of-vocabulary tokens map to the designated
//! fallback id rather than raising.  Decode reconstructs sequences by
//! maximum suffix/prefix overlap stitching, which recovers the input exactly
//! on an untrained vocabulary and is a best-effort heuristic once merged
//! tokens are involved.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]

pub mod alphabet;
pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod serialization;
pub mod splitter;
pub mod stats;
pub mod trainer;
pub mod vocab;

pub use alphabet::Alphabet;
pub use codec::Codec;
pub use config::{TrainerBuilder, TrainerConfig};
pub use error::{KbpeError, Result};
pub use metrics::{RoundMetrics, StopReason, TrainingMetrics};
pub use serialization::VocabFormat;
pub use trainer::Trainer;
pub use vocab::{Pair, TokenId, Vocabulary, FALLBACK_TOKEN_ID};
