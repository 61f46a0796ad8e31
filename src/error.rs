//! # Error taxonomy
//!
//! Every failure the memory subsystem can surface, grouped by where it is fatal:
//!
//! | Error | Raised by | Effect |
//! |-------|-----------|--------|
//! | [`VectorStoreError::DimensionMismatch`] | `build`, `append`, `search` | fails the single operation |
//! | [`LoadError`] | seed loading | fatal at startup |
//! | [`EmbeddingError`] | embedding providers | empty context on retrieval, propagated elsewhere |
//! | [`MemoryError`] | `build_index`, `remember` | fatal at startup, logged per request |
//! | [`GenerationError`] | generators | answered with a fallback line |

use std::path::PathBuf;
use thiserror::Error;

/// Vector store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VectorStoreError {
    /// A vector (or query) does not match the dimension fixed for the store.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Failure to read the seed knowledge base.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read knowledge base {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed knowledge base {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure reported by an embedding provider.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Local model loading, tokenization or inference failed.
    #[error("embedding model error: {0}")]
    Model(String),

    /// Transport failure talking to a remote provider.
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered, but not with something usable.
    #[error("invalid embedding response: {0}")]
    Response(String),
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::Model(err.to_string())
    }
}

/// Failures of operations that mutate or build the shared memory.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),
}

/// Failure of the text generator capability.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("invalid completion request: {0}")]
    InvalidRequest(String),
}

impl From<async_openai::error::OpenAIError> for GenerationError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        GenerationError::Request(err.to_string())
    }
}

/// Failures of a whole generation request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Query is required")]
    EmptyQuery,
}
