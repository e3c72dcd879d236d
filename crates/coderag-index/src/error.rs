//! Error types for coderag-index.

use std::path::PathBuf;

/// Errors raised while enumerating and reading repository files.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The load root does not exist or is not a directory.
    #[error("not a directory: {}", .0.display())]
    InvalidPath(PathBuf),

    /// The directory walk itself failed.
    #[error("walk failed: {0}")]
    Walk(#[from] ignore::Error),

    /// A candidate file could not be classified as text.
    #[error("cannot classify {}: {reason}", .path.display())]
    Unclassified { path: PathBuf, reason: String },

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building a splitter.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },

    #[error("invalid separator pattern: {0}")]
    Separator(#[from] regex::Error),
}

/// Errors raised while building, loading, or querying the vector index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The index directory or its manifest does not exist.
    #[error("no index found at {}; run ingestion first", .0.display())]
    NotFound(PathBuf),

    #[error("failed to write index at {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read index at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index is corrupt: {0}")]
    Corrupt(String),

    /// The index was built with a different embedding provider or model.
    #[error("index was built with {expected}, query provider is {actual}")]
    EmbeddingMismatch { expected: String, actual: String },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding provider failure.
    #[error("embedding failed: {0}")]
    Provider(#[from] coderag_llm::LlmError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
