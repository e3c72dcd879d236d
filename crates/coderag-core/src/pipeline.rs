//! Ingestion: fetch → load → split → index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use coderag_index::{ChunkingPolicy, CodeIndexer, DirectoryLoader, IndexReport};
use coderag_llm::any::AnyProvider;

use crate::config::Config;
use crate::error::RagError;
use crate::source::{SourceFetcher, remove_dir_all_forced};

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub repo_path: PathBuf,
    pub documents: usize,
    pub chunks: usize,
    pub index: IndexReport,
}

/// Rebuild the index from scratch for the configured repository.
///
/// The clone and index directories are removed before the run and again if
/// any stage fails, so an interrupted ingestion leaves nothing behind.
///
/// # Errors
///
/// Returns the first failing stage's error: [`RagError::Config`] for invalid
/// tunables, [`RagError::Source`] for fetch failures, [`RagError::Load`],
/// [`RagError::Split`], or [`RagError::Index`] (which carries provider
/// failures).
pub async fn ingest<F: SourceFetcher>(
    config: &Config,
    fetcher: &F,
    embed: Arc<AnyProvider>,
) -> Result<IngestReport, RagError> {
    config.validate()?;
    config.validate_source()?;
    let repo_path = config.repo_path();
    let index_path = config.index_path();

    cleanup(&[repo_path, index_path]).await;
    match run(config, fetcher, embed).await {
        Ok(report) => Ok(report),
        Err(e) => {
            tracing::error!(error = %e, "ingestion failed, removing partial state");
            cleanup(&[repo_path, index_path]).await;
            Err(e)
        }
    }
}

async fn run<F: SourceFetcher>(
    config: &Config,
    fetcher: &F,
    embed: Arc<AnyProvider>,
) -> Result<IngestReport, RagError> {
    let repo_path = fetcher
        .fetch(&config.source.repo_url, config.repo_path())
        .await?;

    let documents = DirectoryLoader::default().load(&repo_path).await?;
    if documents.is_empty() {
        tracing::warn!(path = %repo_path.display(), "no supported files found");
    }

    let policy = ChunkingPolicy::new(config.splitter_config())?;
    let chunks = policy.split_documents(&documents);
    tracing::info!(
        documents = documents.len(),
        chunks = chunks.len(),
        chunk_size = config.index.chunk_size,
        chunk_overlap = config.index.chunk_overlap,
        "documents split"
    );

    let index = CodeIndexer::new(embed, config.indexer_config())
        .index(&chunks, config.index_path())
        .await?;
    tracing::info!(entries = index.chunks_indexed, path = %config.index.path, "index persisted");

    Ok(IngestReport {
        repo_path,
        documents: documents.len(),
        chunks: chunks.len(),
        index,
    })
}

async fn cleanup(paths: &[&Path]) {
    for path in paths {
        if let Err(e) = remove_dir_all_forced(path).await {
            tracing::warn!(error = %e, "cleanup failed");
        }
    }
}
