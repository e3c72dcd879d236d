//! Persisted vector index: a directory holding `entries.jsonl` (one entry per
//! line, insertion order) and `manifest.json`, which is written last and marks
//! the index as complete.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::document::Chunk;
use crate::error::{IndexError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const ENTRIES_FILE: &str = "entries.jsonl";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub entries: usize,
    pub created_at_unix: u64,
}

/// Chunk payload stored next to its vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub content: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub chunk_index: usize,
}

impl From<&Chunk> for StoredChunk {
    fn from(chunk: &Chunk) -> Self {
        Self {
            content: chunk.content.clone(),
            source: chunk.metadata.source.clone(),
            language: chunk.metadata.language().map(str::to_owned),
            chunk_index: chunk.chunk_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub chunk: StoredChunk,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: StoredChunk,
    pub score: f32,
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> IndexError + '_ {
    move |source| IndexError::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn read_err(path: &Path) -> impl FnOnce(std::io::Error) -> IndexError + '_ {
    move |source| IndexError::Read {
        path: path.to_path_buf(),
        source,
    }
}

/// Builds a fresh index directory. Dropping the writer without calling
/// [`finish`](Self::finish) leaves an index that [`VectorIndex::load`] rejects.
#[derive(Debug)]
pub struct IndexWriter {
    dir: PathBuf,
    file: tokio::io::BufWriter<tokio::fs::File>,
    embedding_provider: String,
    embedding_model: String,
    dimensions: Option<usize>,
    entries: usize,
}

impl IndexWriter {
    /// Remove anything at `dir` and start an empty index there.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Write`] if the directory cannot be reset.
    pub async fn create(dir: &Path, embedding_provider: &str, embedding_model: &str) -> Result<Self> {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => tracing::debug!(path = %dir.display(), "removed previous index"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(write_err(dir)(e)),
        }
        tokio::fs::create_dir_all(dir).await.map_err(write_err(dir))?;

        let entries_path = dir.join(ENTRIES_FILE);
        let file = tokio::fs::File::create(&entries_path)
            .await
            .map_err(write_err(&entries_path))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            file: tokio::io::BufWriter::new(file),
            embedding_provider: embedding_provider.to_owned(),
            embedding_model: embedding_model.to_owned(),
            dimensions: None,
            entries: 0,
        })
    }

    /// Append a batch of entries and flush it to disk.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if a vector's length differs
    /// from the first one written, or [`IndexError::Write`] on I/O failure.
    pub async fn append(&mut self, entries: &[IndexEntry]) -> Result<()> {
        let mut buf = Vec::new();
        for entry in entries {
            let dims = entry.vector.len();
            match self.dimensions {
                None => self.dimensions = Some(dims),
                Some(expected) if expected != dims => {
                    return Err(IndexError::DimensionMismatch {
                        expected,
                        actual: dims,
                    });
                }
                Some(_) => {}
            }
            serde_json::to_writer(&mut buf, entry)?;
            buf.push(b'\n');
        }

        let path = self.dir.join(ENTRIES_FILE);
        self.file.write_all(&buf).await.map_err(write_err(&path))?;
        self.file.flush().await.map_err(write_err(&path))?;
        self.entries += entries.len();
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Write the manifest, completing the index.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Write`] on I/O failure.
    pub async fn finish(mut self) -> Result<IndexManifest> {
        let entries_path = self.dir.join(ENTRIES_FILE);
        self.file.shutdown().await.map_err(write_err(&entries_path))?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_provider: self.embedding_provider,
            embedding_model: self.embedding_model,
            dimensions: self.dimensions.unwrap_or(0),
            entries: self.entries,
            created_at_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
        };

        let manifest_path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(&manifest)?;
        tokio::fs::write(&manifest_path, json)
            .await
            .map_err(write_err(&manifest_path))?;
        Ok(manifest)
    }
}

/// A loaded, read-only index searched by brute-force cosine similarity.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dir: PathBuf,
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Open a previously built index.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] if `dir` or its manifest is missing,
    /// [`IndexError::Corrupt`] if the contents are inconsistent.
    pub async fn load(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let raw = match tokio::fs::read(&manifest_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::NotFound(dir.to_path_buf()));
            }
            Err(e) => return Err(read_err(&manifest_path)(e)),
        };
        let manifest: IndexManifest = serde_json::from_slice(&raw)
            .map_err(|e| IndexError::Corrupt(format!("{MANIFEST_FILE}: {e}")))?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                manifest.format_version
            )));
        }

        let entries_path = dir.join(ENTRIES_FILE);
        let text = match tokio::fs::read_to_string(&entries_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::Corrupt(format!("{ENTRIES_FILE} is missing")));
            }
            Err(e) => return Err(read_err(&entries_path)(e)),
        };

        let mut entries = Vec::with_capacity(manifest.entries);
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: IndexEntry = serde_json::from_str(line)
                .map_err(|e| IndexError::Corrupt(format!("{ENTRIES_FILE} line {}: {e}", i + 1)))?;
            if entry.vector.len() != manifest.dimensions {
                return Err(IndexError::Corrupt(format!(
                    "{ENTRIES_FILE} line {}: vector has {} dimensions, manifest says {}",
                    i + 1,
                    entry.vector.len(),
                    manifest.dimensions
                )));
            }
            entries.push(entry);
        }

        if entries.len() != manifest.entries {
            return Err(IndexError::Corrupt(format!(
                "manifest lists {} entries, found {}",
                manifest.entries,
                entries.len()
            )));
        }

        tracing::info!(path = %dir.display(), entries = entries.len(), "index loaded");
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            entries,
        })
    }

    #[must_use]
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `top_k` entries most similar to `query`, best first. Equal scores
    /// keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if `query` has the wrong length.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if !self.entries.is_empty() && query.len() != self.manifest.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.manifest.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query, &entry.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
