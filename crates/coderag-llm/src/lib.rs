//! Chat and embedding provider abstraction with OpenAI-compatible backends.

pub mod any;
pub mod compatible;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;
pub(crate) mod sse;

pub use error::LlmError;
pub use provider::LlmProvider;
