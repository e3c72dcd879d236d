use std::path::Path;
use std::sync::Arc;

use coderag_index::{
    CodeIndexer, IndexError, IndexerConfig, Retriever, SplitterConfig, load_documents,
    split_documents,
};
use coderag_llm::any::AnyProvider;
use coderag_llm::mock::MockProvider;

const PY_SOURCE: &str = "def greet(name):\n    return 'hi, ' + name + '!!!'\n";

fn markdown_of_len(len: usize) -> String {
    let mut md = String::new();
    let mut i = 0;
    while md.len() < len {
        md.push_str(&format!(
            "## Section {i}\nThe todo list stores item {i} with note number {i}.\n\n"
        ));
        i += 1;
    }
    md.truncate(len);
    md
}

fn write_repo(root: &Path) {
    std::fs::write(root.join("a.py"), PY_SOURCE).unwrap();
    std::fs::write(root.join("b.md"), markdown_of_len(5000)).unwrap();
}

fn mock_provider() -> Arc<AnyProvider> {
    Arc::new(AnyProvider::Mock(MockProvider::default()))
}

#[tokio::test]
async fn small_repository_round_trip() {
    let repo = tempfile::tempdir().unwrap();
    write_repo(repo.path());
    assert_eq!(PY_SOURCE.chars().count(), 50);

    let docs = load_documents(repo.path()).await.unwrap();
    assert_eq!(docs.len(), 2);

    let chunks = split_documents(&docs, SplitterConfig::default()).unwrap();
    let py: Vec<_> = chunks
        .iter()
        .filter(|c| c.metadata.source.ends_with("a.py"))
        .collect();
    let md: Vec<_> = chunks
        .iter()
        .filter(|c| c.metadata.source.ends_with("b.md"))
        .collect();
    assert_eq!(py.len(), 1);
    assert_eq!(py[0].content, PY_SOURCE.trim());
    assert!(md.len() >= 5, "got {} markdown chunks", md.len());
    assert!(chunks.iter().all(|c| c.content.chars().count() <= 1000));

    let index_dir = tempfile::tempdir().unwrap();
    let target = index_dir.path().join("index");
    let provider = mock_provider();
    let report = CodeIndexer::new(Arc::clone(&provider), IndexerConfig::default())
        .index(&chunks, &target)
        .await
        .unwrap();
    assert_eq!(report.chunks_indexed, chunks.len());

    let retriever = Retriever::open(&target, provider).await.unwrap();
    assert_eq!(retriever.index().len(), chunks.len());
    for chunk in &chunks {
        let hits = retriever.retrieve(&chunk.content, 3).await.unwrap();
        assert_eq!(hits[0].chunk.content, chunk.content);
        assert_eq!(hits[0].chunk.source, chunk.metadata.source);
    }
}

#[tokio::test]
async fn repeated_retrieval_is_identical() {
    let repo = tempfile::tempdir().unwrap();
    write_repo(repo.path());
    let docs = load_documents(repo.path()).await.unwrap();
    let chunks = split_documents(&docs, SplitterConfig::default()).unwrap();

    let index_dir = tempfile::tempdir().unwrap();
    let target = index_dir.path().join("index");
    let provider = mock_provider();
    CodeIndexer::new(Arc::clone(&provider), IndexerConfig::default())
        .index(&chunks, &target)
        .await
        .unwrap();
    let retriever = Retriever::open(&target, provider).await.unwrap();

    let first = retriever.retrieve("what does greet return?", 5).await.unwrap();
    let second = retriever.retrieve("what does greet return?", 5).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5.min(chunks.len()));
}

#[tokio::test]
async fn reingestion_replaces_previous_index() {
    let repo = tempfile::tempdir().unwrap();
    write_repo(repo.path());
    let docs = load_documents(repo.path()).await.unwrap();
    let chunks = split_documents(&docs, SplitterConfig::default()).unwrap();

    let index_dir = tempfile::tempdir().unwrap();
    let target = index_dir.path().join("index");
    let indexer = CodeIndexer::new(mock_provider(), IndexerConfig::default());
    indexer.index(&chunks, &target).await.unwrap();
    indexer.index(&chunks[..1], &target).await.unwrap();

    let retriever = Retriever::open(&target, mock_provider()).await.unwrap();
    assert_eq!(retriever.index().len(), 1);
}

#[tokio::test]
async fn querying_never_built_index_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = Retriever::open(&dir.path().join("chroma_db"), mock_provider()).await;
    assert!(matches!(result, Err(IndexError::NotFound(_))));
}
