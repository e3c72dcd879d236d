mod env;
mod types;


pub use types::*;

use std::path::{Path, PathBuf};

use coderag_index::{IndexerConfig, SplitterConfig};

use crate::vault::{Secret, VaultProvider};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("credential lookup failed: {0}")]
    Vault(String),
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`] if the file
    /// exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str::<Self>(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Check tunables that would otherwise fail deep inside a run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.chunk_size == 0 {
            return Err(ConfigError::Invalid("index.chunk_size must be > 0".into()));
        }
        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "index.chunk_overlap ({}) must be smaller than index.chunk_size ({})",
                self.index.chunk_overlap, self.index.chunk_size
            )));
        }
        if self.index.embedding_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "index.embedding_batch_size must be > 0".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature ({}) must be within 0.0..=2.0",
                self.llm.temperature
            )));
        }
        Ok(())
    }

    /// Check the settings only ingestion needs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `source.repo_url` is empty.
    pub fn validate_source(&self) -> Result<(), ConfigError> {
        if self.source.repo_url.trim().is_empty() {
            return Err(ConfigError::Invalid("source.repo_url must not be empty".into()));
        }
        Ok(())
    }

    /// Resolve provider credentials through the vault.
    ///
    /// Absent credentials are left unset; the providers that need them fail
    /// when they are built.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Vault`] if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> Result<(), ConfigError> {
        if let Some(val) = lookup(vault, &self.embedding.api_key_name).await? {
            self.secrets.embedding_api_key = Some(Secret::new(val));
        }
        if let Some(val) = lookup(vault, &self.llm.api_key_name).await? {
            self.secrets.llm_api_key = Some(Secret::new(val));
        }
        Ok(())
    }

    /// Fail unless both provider credentials were resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] naming the first absent key.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.secrets.embedding_api_key.is_none() {
            return Err(ConfigError::MissingCredential(
                self.embedding.api_key_name.clone(),
            ));
        }
        if self.secrets.llm_api_key.is_none() {
            return Err(ConfigError::MissingCredential(self.llm.api_key_name.clone()));
        }
        Ok(())
    }

    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.index.chunk_size,
            chunk_overlap: self.index.chunk_overlap,
        }
    }

    #[must_use]
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            batch_size: self.index.embedding_batch_size,
        }
    }

    #[must_use]
    pub fn index_path(&self) -> &Path {
        Path::new(&self.index.path)
    }

    #[must_use]
    pub fn repo_path(&self) -> &Path {
        Path::new(&self.source.local_path)
    }
}

async fn lookup(vault: &dyn VaultProvider, key: &str) -> Result<Option<String>, ConfigError> {
    vault
        .get_secret(key)
        .await
        .map(|v| v.filter(|s| !s.is_empty()))
        .map_err(|e| ConfigError::Vault(format!("{e:#}")))
}
