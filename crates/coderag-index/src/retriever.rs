//! Query-time retrieval over a loaded [`VectorIndex`].

use std::path::Path;
use std::sync::Arc;

use coderag_llm::any::AnyProvider;
use coderag_llm::provider::LlmProvider;

use crate::error::{IndexError, Result};
use crate::store::{ScoredChunk, VectorIndex};

/// Separator placed between retrieved chunks when building a prompt context.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Embeds queries with the provider the index was built with and returns
/// the nearest chunks.
pub struct Retriever {
    index: VectorIndex,
    provider: Arc<AnyProvider>,
}

impl Retriever {
    /// Load the index at `target` and bind it to `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] for a never-built index and
    /// [`IndexError::EmbeddingMismatch`] if `provider` is not the one the
    /// index was built with.
    pub async fn open(target: &Path, provider: Arc<AnyProvider>) -> Result<Self> {
        let index = VectorIndex::load(target).await?;
        Self::new(index, provider)
    }

    /// # Errors
    ///
    /// Returns [`IndexError::EmbeddingMismatch`] if `provider` does not match
    /// the index manifest.
    pub fn new(index: VectorIndex, provider: Arc<AnyProvider>) -> Result<Self> {
        let manifest = index.manifest();
        let model = provider.embedding_model().unwrap_or("<none>");
        if manifest.embedding_provider != provider.name() || manifest.embedding_model != model {
            return Err(IndexError::EmbeddingMismatch {
                expected: format!("{}/{}", manifest.embedding_provider, manifest.embedding_model),
                actual: format!("{}/{model}", provider.name()),
            });
        }
        Ok(Self { index, provider })
    }

    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// The `top_k` chunks most similar to `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Provider`] if the query cannot be embedded and
    /// [`IndexError::DimensionMismatch`] if its vector has the wrong length.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.provider.embed(query).await?;
        let hits = self.index.search(&vector, top_k)?;
        tracing::debug!(top_k, hits = hits.len(), "retrieved");
        Ok(hits)
    }
}

/// Join chunk contents in retrieval order for prompt injection.
#[must_use]
pub fn format_as_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}
