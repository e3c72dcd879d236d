//! Repository file enumeration with a strict primary strategy and a
//! tolerant glob fallback.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::document::{Document, LANGUAGE_KEY};
use crate::error::LoadError;
use crate::languages::detect_language;

/// File extensions that are loaded, in fallback precedence order.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".md", ".txt", ".go", ".java", ".cpp", ".h", ".html", ".css", ".c",
];

/// Directory names pruned from every walk.
pub const EXCLUDED_DIRS: &[&str] = &["__pycache__", ".git", ".venv", "node_modules"];

/// File name patterns never loaded.
pub const EXCLUDED_FILES: &[&str] = &["*.lock", "*.log"];

/// Bytes inspected when sniffing for binary content.
const SNIFF_LEN: usize = 8192;

pub type LoadFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Document>, LoadError>> + Send + 'a>>;

/// One way of turning a directory tree into documents.
pub trait LoadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn load<'a>(&'a self, root: &'a Path) -> LoadFuture<'a>;
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| &s[1..] == ext))
}

fn is_excluded_dir_name(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

/// Whether `path` (relative to the load root) falls under an exclusion.
fn is_excluded(relative: &Path) -> bool {
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        let name = component.as_os_str().to_string_lossy();
        if components.peek().is_some() {
            if is_excluded_dir_name(&name) {
                return true;
            }
        } else if EXCLUDED_FILES
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .any(|p| p.matches(&name))
        {
            return true;
        }
    }
    false
}

/// Build a document whose source is `<root>/<relative>`.
fn make_document(root: &Path, relative: &Path, content: String) -> Document {
    let path = root.join(relative);
    let mut doc = Document::new(content, path.display().to_string());
    if let Some(lang) = detect_language(&path) {
        doc.metadata
            .extra
            .insert(LANGUAGE_KEY.to_owned(), lang.id().to_owned());
    }
    doc
}

fn classify(path: &Path, bytes: Vec<u8>) -> Result<String, LoadError> {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    if head.contains(&0) {
        return Err(LoadError::Unclassified {
            path: path.to_path_buf(),
            reason: "binary content".into(),
        });
    }
    String::from_utf8(bytes).map_err(|e| LoadError::Unclassified {
        path: path.to_path_buf(),
        reason: format!("not valid UTF-8: {e}"),
    })
}

/// Walks the tree and classifies every candidate by its content. Any file
/// that cannot be read as UTF-8 text fails the whole strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetectingWalk;

impl DetectingWalk {
    fn candidates(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let walker = ignore::WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir
                    && entry.depth() > 0
                    && is_excluded_dir_name(&entry.file_name().to_string_lossy()))
            })
            .build();

        let mut paths = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if is_supported(path) && !is_excluded(relative) {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl LoadStrategy for DetectingWalk {
    fn name(&self) -> &'static str {
        "detecting-walk"
    }

    fn load<'a>(&'a self, root: &'a Path) -> LoadFuture<'a> {
        Box::pin(async move {
            let paths = Self::candidates(root)?;
            let total = paths.len();
            let mut documents = Vec::with_capacity(total);

            for (i, path) in paths.iter().enumerate() {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| LoadError::Unclassified {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                let content = classify(path, bytes)?;
                tracing::debug!(
                    file = %path.display(),
                    progress = format_args!("{}/{total}", i + 1),
                    "loaded"
                );
                let relative = path.strip_prefix(root).unwrap_or(path);
                documents.push(make_document(root, relative, content));
            }

            Ok::<_, LoadError>(documents)
        })
    }
}

/// Enumerates `<root>/**/*<ext>` per supported extension and decodes every
/// file lossily. Unreadable files are logged and skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobFallback;

impl GlobFallback {
    /// Matching files as `(path to read, path relative to root)`, deduplicated
    /// by canonical path in extension order. Globbing runs under the
    /// canonical root and every match is made relative to it.
    fn candidates(root: &Path) -> Result<Vec<(PathBuf, PathBuf)>, LoadError> {
        let base =
            std::fs::canonicalize(root).map_err(|_| LoadError::InvalidPath(root.to_path_buf()))?;
        let escaped_base = glob::Pattern::escape(&base.to_string_lossy());
        let mut seen = HashSet::new();
        let mut paths = Vec::new();

        for ext in SUPPORTED_EXTENSIONS {
            let pattern = format!("{escaped_base}/**/*{ext}");
            for entry in glob::glob(&pattern)? {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable path");
                        continue;
                    }
                };
                if path.is_dir() {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&base) else {
                    tracing::warn!(file = %path.display(), "match outside load root, skipping");
                    continue;
                };
                if is_excluded(relative) {
                    continue;
                }
                let relative = relative.to_path_buf();
                let canonical = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
                if seen.insert(canonical) {
                    paths.push((path, relative));
                }
            }
        }
        Ok(paths)
    }
}

impl LoadStrategy for GlobFallback {
    fn name(&self) -> &'static str {
        "glob-fallback"
    }

    fn load<'a>(&'a self, root: &'a Path) -> LoadFuture<'a> {
        Box::pin(async move {
            let paths = Self::candidates(root)?;
            let mut documents = Vec::with_capacity(paths.len());

            for (path, relative) in &paths {
                match tokio::fs::read(path).await {
                    Ok(bytes) => {
                        let content = String::from_utf8_lossy(&bytes).into_owned();
                        documents.push(make_document(root, relative, content));
                    }
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "skipping unreadable file");
                    }
                }
            }

            Ok::<_, LoadError>(documents)
        })
    }
}

/// Tries the primary strategy and falls back to [`GlobFallback`] if it fails.
pub struct DirectoryLoader {
    primary: Box<dyn LoadStrategy>,
    fallback: Box<dyn LoadStrategy>,
}

impl Default for DirectoryLoader {
    fn default() -> Self {
        Self {
            primary: Box::new(DetectingWalk),
            fallback: Box::new(GlobFallback),
        }
    }
}

impl DirectoryLoader {
    #[must_use]
    pub fn with_primary(primary: Box<dyn LoadStrategy>) -> Self {
        Self {
            primary,
            ..Self::default()
        }
    }

    /// Load every supported, non-excluded file under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidPath`] if `root` is not a directory, or the
    /// fallback's error if both strategies fail.
    pub async fn load(&self, root: &Path) -> Result<Vec<Document>, LoadError> {
        if !root.is_dir() {
            return Err(LoadError::InvalidPath(root.to_path_buf()));
        }

        let documents = match self.primary.load(root).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!(
                    strategy = self.primary.name(),
                    error = %e,
                    "primary loader failed, retrying with {}",
                    self.fallback.name()
                );
                self.fallback.load(root).await?
            }
        };

        tracing::info!(root = %root.display(), documents = documents.len(), "documents loaded");
        Ok(documents)
    }
}

/// Load documents under `root` with the default strategies.
///
/// # Errors
///
/// See [`DirectoryLoader::load`].
pub async fn load_documents(root: &Path) -> Result<Vec<Document>, LoadError> {
    DirectoryLoader::default().load(root).await
}
