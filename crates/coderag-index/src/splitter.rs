//! Recursive, separator-driven chunking with per-language hierarchies.
//!
//! Text is split on the first separator of the hierarchy that occurs in it,
//! keeping each separator at the start of the piece it introduces. Pieces are
//! merged greedily into chunks of at most `chunk_size` characters, carrying up
//! to `chunk_overlap` characters of trailing pieces into the next chunk.
//! Pieces that are still too large are split again with the remaining
//! separators. Lengths are counted in `char`s.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use regex::Regex;

use crate::document::{Chunk, Document, LANGUAGE_KEY};
use crate::error::SplitError;
use crate::languages::{GENERIC_LANGUAGE_ID, GENERIC_SEPARATORS, Lang, detect_language};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

impl SplitterConfig {
    /// # Errors
    ///
    /// Returns an error if `chunk_size` is zero or not larger than `chunk_overlap`.
    pub fn validate(&self) -> Result<(), SplitError> {
        if self.chunk_size == 0 {
            return Err(SplitError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(SplitError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                size: self.chunk_size,
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Separator {
    Pattern(Regex),
    Chars,
}

impl Separator {
    fn occurs_in(&self, text: &str) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(text),
            Self::Chars => true,
        }
    }

    /// Split `text` at every separator occurrence, keeping the separator at
    /// the start of the following piece. Empty pieces are dropped.
    fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        match self {
            Self::Chars => text
                .char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect(),
            Self::Pattern(re) => {
                let mut pieces = Vec::new();
                let mut last = 0;
                for m in re.find_iter(text) {
                    if m.start() > last {
                        pieces.push(&text[last..m.start()]);
                        last = m.start();
                    }
                }
                if last < text.len() {
                    pieces.push(&text[last..]);
                }
                pieces
            }
        }
    }
}

/// Splitter over one separator hierarchy.
#[derive(Debug)]
pub struct RecursiveSplitter {
    separators: Vec<Separator>,
    config: SplitterConfig,
}

impl RecursiveSplitter {
    /// Build a splitter from separator regexes. The empty pattern means
    /// character-level splitting; it is appended when missing so that every
    /// chunk stays within `chunk_size`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration or a pattern that does not compile.
    pub fn new(patterns: &[&str], config: SplitterConfig) -> Result<Self, SplitError> {
        config.validate()?;
        let mut separators = Vec::with_capacity(patterns.len() + 1);
        for pattern in patterns {
            if pattern.is_empty() {
                separators.push(Separator::Chars);
                break;
            }
            separators.push(Separator::Pattern(Regex::new(pattern)?));
        }
        if !matches!(separators.last(), Some(Separator::Chars)) {
            separators.push(Separator::Chars);
        }
        Ok(Self { separators, config })
    }

    /// Paragraph, line, word, character.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration.
    pub fn generic(config: SplitterConfig) -> Result<Self, SplitError> {
        let escaped: Vec<String> = GENERIC_SEPARATORS.iter().map(|s| regex::escape(s)).collect();
        let patterns: Vec<&str> = escaped.iter().map(String::as_str).collect();
        Self::new(&patterns, config)
    }

    /// # Errors
    ///
    /// Returns an error for invalid configuration or if a separator fails to compile.
    pub fn for_language(lang: Lang, config: SplitterConfig) -> Result<Self, SplitError> {
        Self::new(lang.separators(), config)
    }

    /// Split `text` into trimmed, non-empty chunks of at most `chunk_size` chars.
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
            .into_iter()
            .filter_map(|chunk| {
                let trimmed = chunk.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        let Some(pos) = separators.iter().position(|s| s.occurs_in(text)) else {
            return vec![text.to_owned()];
        };
        let separator = &separators[pos];
        let remaining = &separators[pos + 1..];

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();
        for piece in separator.split(text) {
            if char_len(piece) < self.config.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_owned());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let SplitterConfig {
            chunk_size,
            chunk_overlap,
        } = self.config;

        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);
                while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                    let Some((_, front)) = window.pop_front() else {
                        break;
                    };
                    total -= front;
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        push_joined(&mut chunks, &window);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_owned());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Chooses a splitter per document by file extension and splits it.
///
/// Documents whose language splitter could not be built fall back to the
/// generic splitter individually; the rest of the batch is unaffected.
#[derive(Debug)]
pub struct ChunkingPolicy {
    config: SplitterConfig,
    generic: RecursiveSplitter,
    languages: HashMap<Lang, Result<RecursiveSplitter, SplitError>>,
}

impl ChunkingPolicy {
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new(config: SplitterConfig) -> Result<Self, SplitError> {
        let generic = RecursiveSplitter::generic(config)?;
        let languages = Lang::ALL
            .into_iter()
            .map(|lang| (lang, RecursiveSplitter::for_language(lang, config)))
            .collect();
        Ok(Self {
            config,
            generic,
            languages,
        })
    }

    /// Replace the separator hierarchy used for `lang`.
    #[must_use]
    pub fn with_language_separators(mut self, lang: Lang, patterns: &[&str]) -> Self {
        self.languages
            .insert(lang, RecursiveSplitter::new(patterns, self.config));
        self
    }

    #[must_use]
    pub fn config(&self) -> SplitterConfig {
        self.config
    }

    #[must_use]
    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        let source = document.metadata.source.as_str();
        let (splitter, language) = match detect_language(Path::new(source)) {
            Some(lang) => match self.languages.get(&lang) {
                Some(Ok(splitter)) => (splitter, lang.id()),
                Some(Err(e)) => {
                    tracing::warn!(
                        source,
                        language = lang.id(),
                        error = %e,
                        "language splitter unavailable, using generic splitter"
                    );
                    (&self.generic, GENERIC_LANGUAGE_ID)
                }
                None => (&self.generic, GENERIC_LANGUAGE_ID),
            },
            None => (&self.generic, GENERIC_LANGUAGE_ID),
        };

        let chunks: Vec<Chunk> = splitter
            .split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                let mut metadata = document.metadata.clone();
                metadata
                    .extra
                    .insert(LANGUAGE_KEY.to_owned(), language.to_owned());
                Chunk {
                    content,
                    metadata,
                    chunk_index: i,
                }
            })
            .collect();

        tracing::debug!(source, language, chunks = chunks.len(), "document split");
        chunks
    }

    #[must_use]
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.split_document(doc))
            .collect()
    }
}

/// Split every document with the splitter its extension selects.
///
/// # Errors
///
/// Returns an error only if `config` is invalid.
pub fn split_documents(
    documents: &[Document],
    config: SplitterConfig,
) -> Result<Vec<Chunk>, SplitError> {
    Ok(ChunkingPolicy::new(config)?.split_documents(documents))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> SplitterConfig {
        SplitterConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    fn policy(chunk_size: usize, chunk_overlap: usize) -> ChunkingPolicy {
        ChunkingPolicy::new(config(chunk_size, chunk_overlap)).unwrap()
    }

    fn contents(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn small_document_is_single_chunk() {
        let doc = Document::new("print('hello')\n", "repo/a.py");
        let chunks = policy(1000, 100).split_document(&doc);
        assert_eq!(contents(&chunks), vec!["print('hello')"]);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].metadata.source, "repo/a.py");
        assert_eq!(chunks[0].metadata.language(), Some("python"));
    }

    #[test]
    fn empty_and_blank_documents_yield_nothing() {
        let p = policy(100, 10);
        assert!(p.split_document(&Document::new("", "a.txt")).is_empty());
        assert!(p.split_document(&Document::new(" \n\n\t ", "a.md")).is_empty());
    }

    #[test]
    fn python_splits_on_definitions() {
        let text = "import os\n\ndef alpha():\n    return 1\n\ndef beta():\n    return 2\n";
        let chunks = policy(40, 0).split_document(&Document::new(text, "m.py"));
        assert_eq!(
            contents(&chunks),
            vec![
                "import os\n\ndef alpha():\n    return 1",
                "def beta():\n    return 2"
            ]
        );
    }

    #[test]
    fn markdown_splits_on_headings() {
        let text = "# Title\nintro\n## Part A\ntext a\n## Part B\ntext b";
        let chunks = policy(20, 0).split_document(&Document::new(text, "README.md"));
        assert_eq!(
            contents(&chunks),
            vec!["# Title\nintro", "## Part A\ntext a", "## Part B\ntext b"]
        );
        assert!(chunks.iter().all(|c| c.metadata.language() == Some("markdown")));
    }

    #[test]
    fn unknown_extension_uses_generic_splitter() {
        let doc = Document::new("one two three", "notes.txt");
        let chunks = policy(100, 0).split_document(&doc);
        assert_eq!(chunks[0].metadata.language(), Some(GENERIC_LANGUAGE_ID));
    }

    #[test]
    fn empty_source_uses_generic_splitter() {
        let chunks = policy(100, 0).split_document(&Document::new("text", ""));
        assert_eq!(chunks[0].metadata.language(), Some(GENERIC_LANGUAGE_ID));
    }

    #[test]
    fn consecutive_chunks_overlap_within_bound() {
        let words: Vec<String> = (0..200).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");
        let chunks = policy(50, 12).split_document(&Document::new(text, "words.txt"));
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let first: Vec<&str> = pair[0].content.split(' ').collect();
            let second: Vec<&str> = pair[1].content.split(' ').collect();
            let shared: Vec<&str> = second
                .iter()
                .take_while(|w| first.contains(*w))
                .copied()
                .collect();
            assert!(!shared.is_empty(), "expected carry-over between chunks");
            assert!(shared.join(" ").chars().count() <= 12);
        }
    }

    #[test]
    fn zero_overlap_chunks_are_disjoint() {
        let words: Vec<String> = (0..100).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");
        let chunks = policy(30, 0).split_document(&Document::new(text.clone(), "w.txt"));
        let rejoined = contents(&chunks).join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn lengths_are_counted_in_chars() {
        let text = "ééééé";
        let chunks = policy(5, 0).split_document(&Document::new(text, "u.txt"));
        assert_eq!(contents(&chunks), vec!["ééééé"]);
    }

    #[test]
    fn character_level_split_for_tiny_chunk_size() {
        let chunks = policy(1, 0).split_document(&Document::new("abc", "x.txt"));
        assert_eq!(contents(&chunks), vec!["a", "b", "c"]);
    }

    #[test]
    fn broken_language_splitter_falls_back_per_document() {
        let text = "def a():\n    pass\n\ndef b():\n    pass\n";
        let broken = policy(20, 0).with_language_separators(Lang::Python, &["(unclosed", "\n"]);
        let generic = RecursiveSplitter::generic(config(20, 0)).unwrap();

        let docs = vec![
            Document::new(text, "bad.py"),
            Document::new("# Head\nbody", "ok.md"),
        ];
        let chunks = broken.split_documents(&docs);

        let py: Vec<&Chunk> = chunks.iter().filter(|c| c.metadata.source == "bad.py").collect();
        assert!(py.iter().all(|c| c.metadata.language() == Some(GENERIC_LANGUAGE_ID)));
        let py_text: Vec<String> = py.iter().map(|c| c.content.clone()).collect();
        assert_eq!(py_text, generic.split_text(text));

        let md: Vec<&Chunk> = chunks.iter().filter(|c| c.metadata.source == "ok.md").collect();
        assert_eq!(md[0].metadata.language(), Some("markdown"));
    }

    #[test]
    fn missing_character_level_separator_is_appended() {
        let splitter = RecursiveSplitter::new(&["\n"], config(3, 0)).unwrap();
        let chunks = splitter.split_text("abcdefg");
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
        assert_eq!(chunks.concat(), "abcdefg");
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            ChunkingPolicy::new(config(0, 0)),
            Err(SplitError::ZeroChunkSize)
        ));
        assert!(matches!(
            ChunkingPolicy::new(config(100, 100)),
            Err(SplitError::OverlapTooLarge { .. })
        ));
        assert!(split_documents(&[], config(10, 20)).is_err());
    }

    #[test]
    fn metadata_is_cloned_from_parent() {
        let mut doc = Document::new("content here", "src/a.go");
        doc.metadata.extra.insert("repo".into(), "todo".into());
        let chunks = policy(100, 0).split_document(&doc);
        assert_eq!(chunks[0].metadata.extra.get("repo").map(String::as_str), Some("todo"));
        assert_eq!(chunks[0].metadata.language(), Some("go"));
    }

    mod proptest_splitter {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn chunks_are_bounded_nonempty_substrings(
                content in "\\PC{0,1500}",
                chunk_size in 1usize..300,
                overlap_ratio in 0usize..100,
                ext in prop::sample::select(vec!["py", "md", "js", "ts", "go", "java", "cpp", "txt", "html"]),
            ) {
                let chunk_overlap = (chunk_size * overlap_ratio / 100).min(chunk_size - 1);
                let p = policy(chunk_size, chunk_overlap);
                let doc = Document::new(content.clone(), format!("f.{ext}"));
                let chunks = p.split_document(&doc);

                // Byte span of the previous chunk within `content`.
                let mut prev: Option<(usize, usize)> = None;
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.chunk_index, i);
                    prop_assert!(!chunk.content.is_empty());
                    prop_assert!(chunk.content.chars().count() <= chunk_size);

                    let floor = prev.map_or(0, |(start, end)| {
                        content[start..end]
                            .char_indices()
                            .rev()
                            .take(chunk_overlap)
                            .last()
                            .map_or(end, |(offset, _)| start + offset)
                    });
                    let found = content[floor..].find(chunk.content.as_str());
                    prop_assert!(found.is_some(), "chunk {} not found at or after byte {}", i, floor);
                    let start = floor + found.unwrap();
                    if let Some((_, prev_end)) = prev {
                        if start < prev_end {
                            prop_assert!(content[start..prev_end].chars().count() <= chunk_overlap);
                        }
                    }
                    prev = Some((start, start + chunk.content.len()));
                }
            }

            #[test]
            fn short_documents_are_one_trimmed_chunk(
                content in "[a-z][a-z \n]{0,60}[a-z]",
                ext in prop::sample::select(vec!["py", "md", "txt"]),
            ) {
                let chunks = policy(100, 10).split_document(&Document::new(content.clone(), format!("f.{ext}")));
                prop_assert_eq!(chunks.len(), 1);
                prop_assert_eq!(&chunks[0].content, &content);
            }

            #[test]
            fn nonblank_content_yields_chunks(
                content in "[a-z]{1,10}( [a-z]{1,10}){0,200}",
                chunk_size in 10usize..200,
            ) {
                let chunks = policy(chunk_size, 0).split_document(&Document::new(content, "f.txt"));
                prop_assert!(!chunks.is_empty());
            }
        }
    }
}
