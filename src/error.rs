//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = KbpeError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during configuration, IO, or tokenizer operations.
#[derive(Debug, Error)]
pub enum KbpeError {
    /// A sequence contained a character outside the configured alphabet.
    #[error("invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol {
        /// Offending character as found in the (uppercased) input.
        symbol: char,
        /// Byte offset of the offending character within the input.
        position: usize,
    },
    /// Training or alphabet configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A vocabulary file carried an extension other than the supported ones.
    #[error("unsupported vocabulary format: {0} (expected `.json` or `.model`)")]
    UnsupportedFormat(String),
    /// A vocabulary file was readable but structurally inconsistent.
    #[error("corrupt vocabulary data: {0}")]
    CorruptData(String),
    /// A merge round failed repeatedly despite invalidated-pair retries.
    #[error("merge inconsistency: {0}")]
    MergeInconsistency(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for KbpeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for KbpeError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl KbpeError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}
