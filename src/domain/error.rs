// ============================================================
// Layer 3 — Error Kinds
// ============================================================
// Every fallible operation in the data layer returns one of
// these. The application and CLI layers wrap them in anyhow
// with extra context; nothing below them panics on bad input.

use thiserror::Error;

/// Result alias used throughout the data layer.
pub type Result<T> = std::result::Result<T, TextDataError>;

#[derive(Debug, Error)]
pub enum TextDataError {
    /// Invalid construction parameters (e.g. max size below the reserved count)
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// An accessor was called before `preprocess`
    #[error("{0} called before preprocess")]
    NotInitialized(&'static str),

    /// Index or token lookup outside the valid bounds
    #[error("index {index} out of range for {what} of size {len}")]
    OutOfRange {
        what:  &'static str,
        index: usize,
        len:   usize,
    },

    /// Pretrained source malformed or a token could not be resolved
    #[error("cannot load embedding: {0}")]
    EmbeddingLoad(String),

    /// Raised while embedding one example; carries the original cause
    #[error("cannot embed example {example}")]
    Embedding {
        example: usize,
        #[source]
        source:  Box<TextDataError>,
    },
}

impl TextDataError {
    pub fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Self::OutOfRange { what, index, len }
    }

    /// The innermost error, unwrapping any `Embedding` layers.
    pub fn root_cause(&self) -> &TextDataError {
        match self {
            Self::Embedding { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
