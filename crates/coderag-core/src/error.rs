use coderag_index::{IndexError, LoadError, SplitError};
use coderag_llm::LlmError;

use crate::config::ConfigError;
use crate::source::SourceFetchError;

/// Failure of an ingestion or query run.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceFetchError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
