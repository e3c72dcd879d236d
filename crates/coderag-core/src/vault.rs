use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde::Deserialize;

use crate::config::ConfigError;

/// Wrapper for sensitive strings with redacted Debug/Display.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Pluggable secret retrieval backend.
pub trait VaultProvider: Send + Sync {
    fn get_secret(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + '_>>;
}

/// Look up `key` and fail if it is absent or empty.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredential`] when the vault has no value and
/// [`ConfigError::Vault`] when the backend itself fails.
pub async fn require_secret(vault: &dyn VaultProvider, key: &str) -> Result<Secret, ConfigError> {
    match vault.get_secret(key).await {
        Ok(Some(val)) if !val.is_empty() => Ok(Secret::new(val)),
        Ok(_) => Err(ConfigError::MissingCredential(key.to_owned())),
        Err(e) => Err(ConfigError::Vault(format!("{e:#}"))),
    }
}

/// Reads secrets from the process environment, then from an optional
/// dotenv-style file.
#[derive(Default)]
pub struct EnvVaultProvider {
    file_values: HashMap<String, String>,
}

impl fmt::Debug for EnvVaultProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVaultProvider")
            .field(
                "file_values",
                &format_args!("[{} secrets]", self.file_values.len()),
            )
            .finish()
    }
}

impl EnvVaultProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the `KEY=VALUE` lines of `path` as a lower-priority source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read.
    pub fn with_env_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.file_values = parse_env_file(&content);
        tracing::debug!(
            path = %path.display(),
            count = self.file_values.len(),
            "loaded env file"
        );
        Ok(self)
    }
}

impl VaultProvider for EnvVaultProvider {
    fn get_secret(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + '_>> {
        let key = key.to_owned();
        Box::pin(async move {
            Ok(std::env::var(&key)
                .ok()
                .or_else(|| self.file_values.get(&key).cloned()))
        })
    }
}

fn parse_env_file(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_owned(), unquote(value.trim()).to_owned()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
