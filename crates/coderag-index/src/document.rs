use std::collections::HashMap;

/// Metadata key holding the language id a document or chunk was split as.
pub const LANGUAGE_KEY: &str = "language";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentMetadata {
    /// Path of the file as reached from the load root.
    pub source: String,
    pub extra: HashMap<String, String>,
}

impl DocumentMetadata {
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.extra.get(LANGUAGE_KEY).map(String::as_str)
    }
}

/// The text content of one repository file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    #[must_use]
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                extra: HashMap::new(),
            },
        }
    }
}

/// A contiguous, bounded-size slice of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub chunk_index: usize,
}
