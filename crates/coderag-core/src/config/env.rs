use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_source();
        self.apply_env_overrides_providers();
    }

    fn apply_env_overrides_source(&mut self) {
        if let Ok(v) = std::env::var("CODERAG_REPO_URL") {
            self.source.repo_url = v;
        }
        if let Ok(v) = std::env::var("CODERAG_REPO_BRANCH") {
            self.source.branch = (!v.is_empty()).then_some(v);
        }
        if let Ok(v) = std::env::var("CODERAG_REPO_PATH") {
            self.source.local_path = v;
        }
        if let Ok(v) = std::env::var("CODERAG_INDEX_PATH") {
            self.index.path = v;
        }
        if let Ok(v) = std::env::var("CODERAG_CHUNK_SIZE") {
            match v.parse::<usize>() {
                Ok(size) => self.index.chunk_size = size,
                Err(_) => tracing::warn!("ignoring invalid CODERAG_CHUNK_SIZE value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("CODERAG_CHUNK_OVERLAP") {
            match v.parse::<usize>() {
                Ok(overlap) => self.index.chunk_overlap = overlap,
                Err(_) => tracing::warn!("ignoring invalid CODERAG_CHUNK_OVERLAP value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("CODERAG_EMBEDDING_BATCH_SIZE") {
            match v.parse::<usize>() {
                Ok(size) => self.index.embedding_batch_size = size,
                Err(_) => {
                    tracing::warn!("ignoring invalid CODERAG_EMBEDDING_BATCH_SIZE value: {v}");
                }
            }
        }
        if let Ok(v) = std::env::var("CODERAG_TOP_K") {
            match v.parse::<usize>() {
                Ok(k) => self.retrieval.top_k = k,
                Err(_) => tracing::warn!("ignoring invalid CODERAG_TOP_K value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("CODERAG_ANSWER_LANGUAGE") {
            self.answer.language = v;
        }
    }

    fn apply_env_overrides_providers(&mut self) {
        if let Ok(v) = std::env::var("CODERAG_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("CODERAG_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("CODERAG_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("CODERAG_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("CODERAG_LLM_MAX_TOKENS") {
            match v.parse::<u32>() {
                Ok(tokens) => self.llm.max_tokens = tokens,
                Err(_) => tracing::warn!("ignoring invalid CODERAG_LLM_MAX_TOKENS value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("CODERAG_LLM_TEMPERATURE") {
            match v.parse::<f32>() {
                Ok(t) => self.llm.temperature = t,
                Err(_) => tracing::warn!("ignoring invalid CODERAG_LLM_TEMPERATURE value: {v}"),
            }
        }
    }
}
