//! Language detection and per-language separator hierarchies.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Language with a dedicated separator hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    Cpp,
    C,
    Rust,
    Markdown,
    Html,
}

/// Language id recorded for documents that use the generic splitter.
pub const GENERIC_LANGUAGE_ID: &str = "text";

/// Separators of the generic splitter: paragraph, line, word, character.
pub const GENERIC_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

impl Lang {
    pub const ALL: [Self; 10] = [
        Self::Python,
        Self::JavaScript,
        Self::TypeScript,
        Self::Go,
        Self::Java,
        Self::Cpp,
        Self::C,
        Self::Rust,
        Self::Markdown,
        Self::Html,
    ];

    /// Identifier stored in chunk metadata.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Rust => "rust",
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }

    /// Separator regexes, most structural first. The empty pattern means
    /// "split into characters" and always terminates the list.
    #[must_use]
    pub fn separators(self) -> &'static [&'static str] {
        match self {
            Self::Python => &["\nclass ", "\ndef ", "\n\tdef ", "\n\n", "\n", " ", ""],
            Self::JavaScript => &[
                "\nfunction ",
                "\nconst ",
                "\nlet ",
                "\nvar ",
                "\nclass ",
                "\nif ",
                "\nfor ",
                "\nwhile ",
                "\nswitch ",
                "\ncase ",
                "\ndefault ",
                "\n\n",
                "\n",
                " ",
                "",
            ],
            Self::TypeScript => &[
                "\nenum ",
                "\ninterface ",
                "\nnamespace ",
                "\ntype ",
                "\nclass ",
                "\nfunction ",
                "\nconst ",
                "\nlet ",
                "\nvar ",
                "\nif ",
                "\nfor ",
                "\nwhile ",
                "\nswitch ",
                "\ncase ",
                "\ndefault ",
                "\n\n",
                "\n",
                " ",
                "",
            ],
            Self::Go => &[
                "\nfunc ",
                "\nvar ",
                "\nconst ",
                "\ntype ",
                "\nif ",
                "\nfor ",
                "\nswitch ",
                "\ncase ",
                "\n\n",
                "\n",
                " ",
                "",
            ],
            Self::Java => &[
                "\nclass ",
                "\npublic ",
                "\nprotected ",
                "\nprivate ",
                "\nstatic ",
                "\nif ",
                "\nfor ",
                "\nwhile ",
                "\nswitch ",
                "\ncase ",
                "\n\n",
                "\n",
                " ",
                "",
            ],
            Self::Cpp | Self::C => &[
                "\nclass ",
                "\nvoid ",
                "\nint ",
                "\nfloat ",
                "\ndouble ",
                "\nif ",
                "\nfor ",
                "\nwhile ",
                "\nswitch ",
                "\ncase ",
                "\n\n",
                "\n",
                " ",
                "",
            ],
            Self::Rust => &[
                "\nfn ",
                "\nconst ",
                "\nlet ",
                "\nif ",
                "\nwhile ",
                "\nfor ",
                "\nloop ",
                "\nmatch ",
                "\n\n",
                "\n",
                " ",
                "",
            ],
            Self::Markdown => &[
                "\n#{1,6} ",
                "```\n",
                "\n\\*\\*\\*+\n",
                "\n---+\n",
                "\n___+\n",
                "\n\n",
                "\n",
                " ",
                "",
            ],
            Self::Html => &[
                "<body", "<div", "<p", "<br", "<li", "<h1", "<h2", "<h3", "<h4", "<h5", "<h6",
                "<span", "<table", "<tr", "<td", "<th", "<ul", "<ol", "<header", "<footer",
                "<nav", "<head", "<style", "<script", "<meta", "<title", "",
            ],
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Detect language from file extension.
#[must_use]
pub fn detect_language(path: &Path) -> Option<Lang> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "py" | "pyi" => Some(Lang::Python),
        "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
        "ts" | "tsx" | "mts" | "cts" => Some(Lang::TypeScript),
        "go" => Some(Lang::Go),
        "java" => Some(Lang::Java),
        "cpp" | "cc" | "cxx" | "hpp" => Some(Lang::Cpp),
        "c" | "h" => Some(Lang::C),
        "rs" => Some(Lang::Rust),
        "md" | "markdown" => Some(Lang::Markdown),
        "html" | "htm" => Some(Lang::Html),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_language_py() {
        assert_eq!(detect_language(Path::new("app/main.py")), Some(Lang::Python));
    }

    #[test]
    fn detect_language_js_variants() {
        for ext in &["js", "jsx", "mjs", "cjs"] {
            let path = format!("file.{ext}");
            assert_eq!(
                detect_language(Path::new(&path)),
                Some(Lang::JavaScript),
                "failed for .{ext}"
            );
        }
    }

    #[test]
    fn detect_language_c_family() {
        assert_eq!(detect_language(Path::new("a.cpp")), Some(Lang::Cpp));
        assert_eq!(detect_language(Path::new("a.h")), Some(Lang::C));
        assert_eq!(detect_language(Path::new("a.c")), Some(Lang::C));
    }

    #[test]
    fn detect_language_generic_files_return_none() {
        assert_eq!(detect_language(Path::new("notes.txt")), None);
        assert_eq!(detect_language(Path::new("style.css")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
        assert_eq!(detect_language(Path::new("")), None);
    }

    #[test]
    fn every_hierarchy_ends_with_character_level() {
        for lang in Lang::ALL {
            assert_eq!(lang.separators().last(), Some(&""), "{lang}");
        }
        assert_eq!(GENERIC_SEPARATORS.last(), Some(&""));
    }

    #[test]
    fn every_separator_compiles() {
        for lang in Lang::ALL {
            for sep in lang.separators() {
                assert!(regex::Regex::new(sep).is_ok(), "{lang}: {sep:?}");
            }
        }
    }

    #[test]
    fn python_definitions_come_first() {
        assert_eq!(&Lang::Python.separators()[..2], &["\nclass ", "\ndef "]);
    }

    #[test]
    fn display_uses_id() {
        assert_eq!(Lang::TypeScript.to_string(), "typescript");
    }
}
