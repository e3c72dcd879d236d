//! Repository ingestion and retrieval: load files, split them into
//! language-aware chunks, embed them into a persisted vector index, and
//! answer nearest-neighbor queries against it.

pub mod document;
pub mod error;
pub mod indexer;
pub mod languages;
pub mod loader;
pub mod retriever;
pub mod splitter;
pub mod store;

pub use document::{Chunk, Document, DocumentMetadata};
pub use error::{IndexError, LoadError, Result, SplitError};
pub use indexer::{CodeIndexer, IndexReport, IndexerConfig};
pub use loader::{DirectoryLoader, load_documents};
pub use retriever::{CONTEXT_DELIMITER, Retriever, format_as_context};
pub use splitter::{ChunkingPolicy, SplitterConfig, split_documents};
pub use store::{IndexManifest, ScoredChunk, VectorIndex};
