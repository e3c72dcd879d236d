//! Configuration, credentials, repository materialization, the ingestion
//! pipeline, and retrieval-augmented answer composition.

pub mod answer;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod vault;

pub use answer::AnswerComposer;
pub use config::{Config, ConfigError};
pub use error::RagError;
pub use source::{GitFetcher, SourceFetchError, SourceFetcher};
