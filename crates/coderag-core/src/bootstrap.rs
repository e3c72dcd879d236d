//! Builds the configured providers from a resolved [`Config`].

use coderag_llm::any::AnyProvider;
use coderag_llm::compatible::CompatibleProvider;
use coderag_llm::openai::OpenAiProvider;

use crate::config::{Config, ConfigError, ProviderKind};
use crate::vault::Secret;

const EMBEDDING_MAX_TOKENS: u32 = 1024;

/// Provider used to embed chunks at ingestion and questions at query time.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredential`] if the embedding key was not
/// resolved. No network call is made.
pub fn create_embedding_provider(config: &Config) -> Result<AnyProvider, ConfigError> {
    let cfg = &config.embedding;
    let api_key = credential(
        config.secrets.embedding_api_key.as_ref(),
        &cfg.api_key_name,
    )?;
    let provider = match cfg.kind {
        ProviderKind::OpenAi => AnyProvider::OpenAi(OpenAiProvider::new(
            api_key,
            cfg.base_url.clone(),
            cfg.model.clone(),
            EMBEDDING_MAX_TOKENS,
            Some(cfg.model.clone()),
        )),
        ProviderKind::Compatible => AnyProvider::Compatible(CompatibleProvider::new(
            cfg.provider.clone(),
            api_key,
            cfg.base_url.clone(),
            cfg.model.clone(),
            EMBEDDING_MAX_TOKENS,
            Some(cfg.model.clone()),
        )),
    };
    tracing::debug!(provider = %cfg.provider, model = %cfg.model, "embedding provider ready");
    Ok(provider)
}

/// Provider used to compose answers.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredential`] if the chat key was not
/// resolved. No network call is made.
pub fn create_chat_provider(config: &Config) -> Result<AnyProvider, ConfigError> {
    let cfg = &config.llm;
    let api_key = credential(config.secrets.llm_api_key.as_ref(), &cfg.api_key_name)?;
    let provider = match cfg.kind {
        ProviderKind::OpenAi => AnyProvider::OpenAi(
            OpenAiProvider::new(
                api_key,
                cfg.base_url.clone(),
                cfg.model.clone(),
                cfg.max_tokens,
                None,
            )
            .with_temperature(cfg.temperature),
        ),
        ProviderKind::Compatible => AnyProvider::Compatible(
            CompatibleProvider::new(
                cfg.provider.clone(),
                api_key,
                cfg.base_url.clone(),
                cfg.model.clone(),
                cfg.max_tokens,
                None,
            )
            .with_temperature(cfg.temperature),
        ),
    };
    tracing::debug!(provider = %cfg.provider, model = %cfg.model, "chat provider ready");
    Ok(provider)
}

fn credential(secret: Option<&Secret>, name: &str) -> Result<String, ConfigError> {
    secret
        .map(|s| s.expose().to_owned())
        .ok_or_else(|| ConfigError::MissingCredential(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use coderag_llm::provider::LlmProvider;

    use super::*;

    fn config_with_keys() -> Config {
        let mut config = Config::default();
        config.secrets.embedding_api_key = Some(Secret::new("zk"));
        config.secrets.llm_api_key = Some(Secret::new("mk"));
        config
    }

    #[test]
    fn embedding_provider_defaults_to_zhipu_compatible() {
        let provider = create_embedding_provider(&config_with_keys()).unwrap();
        assert!(matches!(provider, AnyProvider::Compatible(_)));
        assert_eq!(provider.name(), "zhipu");
        assert_eq!(provider.embedding_model(), Some("embedding-2"));
        assert!(provider.supports_embeddings());
    }

    #[test]
    fn chat_provider_defaults_to_moonshot_without_embeddings() {
        let provider = create_chat_provider(&config_with_keys()).unwrap();
        assert_eq!(provider.name(), "moonshot");
        assert!(provider.embedding_model().is_none());
    }

    #[test]
    fn openai_kind_builds_openai_provider() {
        let mut config = config_with_keys();
        config.llm.kind = ProviderKind::OpenAi;
        let provider = create_chat_provider(&config).unwrap();
        assert!(matches!(provider, AnyProvider::OpenAi(_)));
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn missing_embedding_key_is_missing_credential() {
        let mut config = config_with_keys();
        config.secrets.embedding_api_key = None;
        let err = create_embedding_provider(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(ref k) if k == "ZHIPUAI_API_KEY"));
    }

    #[test]
    fn missing_chat_key_is_missing_credential() {
        let mut config = config_with_keys();
        config.secrets.llm_api_key = None;
        let err = create_chat_provider(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(ref k) if k == "MOONSHOT_API_KEY"));
    }
}
