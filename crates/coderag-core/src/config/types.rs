use serde::{Deserialize, Serialize};

use crate::vault::Secret;

pub const DEFAULT_REPO_URL: &str = "https://github.com/HUST-Spike/TodoList.git";
pub const ZHIPU_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const MOONSHOT_BASE_URL: &str = "https://api.moonshot.cn/v1";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// Wire protocol spoken by a provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    /// OpenAI-compatible endpoint reported under its own name.
    #[default]
    Compatible,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub repo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub local_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repo_url: DEFAULT_REPO_URL.into(),
            branch: None,
            local_path: "./repos".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: "./chroma_db".into(),
            chunk_size: 1000,
            chunk_overlap: 100,
            embedding_batch_size: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Name the provider is reported under and recorded in the index manifest.
    pub provider: String,
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    /// Credential name looked up through the vault.
    pub api_key_name: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "zhipu".into(),
            kind: ProviderKind::Compatible,
            base_url: ZHIPU_BASE_URL.into(),
            model: "embedding-2".into(),
            api_key_name: "ZHIPUAI_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub api_key_name: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "moonshot".into(),
            kind: ProviderKind::Compatible,
            base_url: MOONSHOT_BASE_URL.into(),
            model: "kimi-k2-turbo-preview".into(),
            max_tokens: 4096,
            temperature: 0.0,
            api_key_name: "MOONSHOT_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Natural language the model is asked to answer in.
    pub language: String,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            language: "Chinese".into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedSecrets {
    pub embedding_api_key: Option<Secret>,
    pub llm_api_key: Option<Secret>,
}
