//! Ingestion orchestrator: chunks → embeddings → persisted index.

use std::path::Path;
use std::sync::Arc;

use coderag_llm::LlmError;
use coderag_llm::any::AnyProvider;
use coderag_llm::provider::LlmProvider;

use crate::document::Chunk;
use crate::error::{IndexError, Result};
use crate::store::{IndexEntry, IndexWriter, StoredChunk};

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Number of chunks sent per embedding request.
    pub batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self { batch_size: 16 }
    }
}

/// Summary of an indexing run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub chunks_indexed: usize,
    pub batches: usize,
    pub dimensions: usize,
    pub duration_ms: u64,
}

/// Embeds chunks and writes them to a fresh index directory.
pub struct CodeIndexer {
    provider: Arc<AnyProvider>,
    config: IndexerConfig,
}

impl CodeIndexer {
    #[must_use]
    pub fn new(provider: Arc<AnyProvider>, config: IndexerConfig) -> Self {
        Self { provider, config }
    }

    /// Replace whatever is at `target` with an index of `chunks`.
    ///
    /// Batches are embedded one after another. A failure part-way leaves the
    /// entries written so far but no manifest, so the index will not load.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Provider`] if embedding fails (including missing
    /// embedding support or a rejected credential) and [`IndexError::Write`]
    /// if the index cannot be persisted.
    pub async fn index(&self, chunks: &[Chunk], target: &Path) -> Result<IndexReport> {
        let start = std::time::Instant::now();
        let provider_name = self.provider.name().to_owned();

        let Some(model) = self
            .provider
            .embedding_model()
            .filter(|_| self.provider.supports_embeddings())
        else {
            return Err(IndexError::Provider(LlmError::EmbedUnsupported {
                provider: provider_name,
            }));
        };

        let mut writer = IndexWriter::create(target, &provider_name, model).await?;
        let total = chunks.len();
        tracing::info!(total, provider = %provider_name, model, "indexing started");

        let mut report = IndexReport::default();
        for batch in chunks.chunks(self.config.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.provider.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(IndexError::Provider(LlmError::Other(format!(
                    "{provider_name} returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                ))));
            }

            let entries: Vec<IndexEntry> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry {
                    vector,
                    chunk: StoredChunk::from(chunk),
                })
                .collect();
            writer.append(&entries).await?;

            report.batches += 1;
            report.chunks_indexed += entries.len();
            tracing::info!(
                progress = format_args!("{}/{total}", report.chunks_indexed),
                "embedded batch"
            );
        }

        let manifest = writer.finish().await?;
        report.dimensions = manifest.dimensions;
        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            chunks = report.chunks_indexed,
            dimensions = report.dimensions,
            duration_ms = report.duration_ms,
            "indexing finished"
        );
        Ok(report)
    }
}
