use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use coderag_core::bootstrap::{create_chat_provider, create_embedding_provider};
use coderag_core::config::Config;
use coderag_core::pipeline::ingest;
use coderag_core::vault::{EnvVaultProvider, Secret};
use coderag_core::{AnswerComposer, GitFetcher};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Debug, Parser)]
#[command(
    name = "coderag",
    version = env!("CARGO_PKG_VERSION"),
    about = "Ask questions about a code repository, answered from its own source"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Dotenv-style file with provider credentials (defaults to ./.env when present).
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clone the configured repository and rebuild the vector index.
    Ingest,

    /// Answer a question, or read questions from stdin when none is given.
    Query {
        question: Option<String>,

        /// Print the answer once it is complete instead of streaming it.
        #[arg(long)]
        no_stream: bool,
    },

    /// Print the effective configuration with credentials redacted.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = Config::load(&config_path)?;
    config.validate()?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    let vault = build_vault(cli.env_file.as_deref())?;
    config.resolve_secrets(&vault).await?;

    match cli.command {
        Command::Ingest => run_ingest(&config).await,
        Command::Query {
            question,
            no_stream,
        } => run_query(&config, question.as_deref(), !no_stream).await,
        Command::Config => {
            print!("{}", render_config(&config)?);
            Ok(())
        }
    }
}

async fn run_ingest(config: &Config) -> anyhow::Result<()> {
    let embed = Arc::new(create_embedding_provider(config)?);
    let fetcher = GitFetcher::new(config.source.branch.clone());
    let report = ingest(config, &fetcher, embed)
        .await
        .context("ingestion failed")?;
    println!(
        "Indexed {} chunks from {} documents into {}",
        report.index.chunks_indexed, report.documents, config.index.path
    );
    Ok(())
}

async fn run_query(config: &Config, question: Option<&str>, stream: bool) -> anyhow::Result<()> {
    config.require_credentials()?;
    let chat = Arc::new(create_chat_provider(config)?);
    let embed = Arc::new(create_embedding_provider(config)?);
    let composer = AnswerComposer::open(config, chat, embed)
        .await
        .with_context(|| format!("cannot open index at {} (run `coderag ingest` first)", config.index.path))?;

    if let Some(question) = question {
        return answer_one(&composer, question, stream).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("question> ");
        std::io::stderr().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line == "exit" || line == "quit" {
            break;
        }
        answer_one(&composer, line, stream).await?;
    }
    Ok(())
}

async fn answer_one(composer: &AnswerComposer, question: &str, stream: bool) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    if stream {
        let mut fragments = composer.answer_stream(question).await?;
        while let Some(fragment) = fragments.next().await {
            write!(stdout, "{}", fragment?)?;
            stdout.flush()?;
        }
        writeln!(stdout)?;
    } else {
        let answer = composer.answer(question).await?;
        writeln!(stdout, "{answer}")?;
    }
    Ok(())
}

fn render_config(config: &Config) -> anyhow::Result<String> {
    let mut out = toml::to_string_pretty(config).context("failed to render config")?;
    out.push_str("\n# credentials\n");
    for (name, secret) in [
        (&config.embedding.api_key_name, &config.secrets.embedding_api_key),
        (&config.llm.api_key_name, &config.secrets.llm_api_key),
    ] {
        out.push_str(&format!("# {name} = {}\n", describe_secret(secret.as_ref())));
    }
    Ok(out)
}

fn describe_secret(secret: Option<&Secret>) -> String {
    secret.map_or_else(|| "<unset>".to_owned(), ToString::to_string)
}

fn build_vault(env_file: Option<&Path>) -> anyhow::Result<EnvVaultProvider> {
    if let Some(path) = env_file {
        return Ok(EnvVaultProvider::new().with_env_file(path)?);
    }
    let default = Path::new(DEFAULT_ENV_FILE);
    if default.is_file() {
        return Ok(EnvVaultProvider::new().with_env_file(default)?);
    }
    Ok(EnvVaultProvider::new())
}

fn resolve_config_path(arg: Option<&Path>) -> PathBuf {
    if let Some(path) = arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("CODERAG_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use coderag_core::vault::VaultProvider;
    use serial_test::serial;

    use super::*;

    #[test]
    fn parse_query_with_question_and_flags() {
        let cli = Cli::try_parse_from([
            "coderag",
            "query",
            "where is the db?",
            "--no-stream",
            "--config",
            "alt.toml",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("alt.toml")));
        match cli.command {
            Command::Query {
                question,
                no_stream,
            } => {
                assert_eq!(question.as_deref(), Some("where is the db?"));
                assert!(no_stream);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_interactive_query() {
        let cli = Cli::try_parse_from(["coderag", "query"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Query {
                question: None,
                no_stream: false
            }
        ));
    }

    #[test]
    fn parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["coderag"]).is_err());
    }

    #[test]
    #[serial]
    fn resolve_config_path_prefers_argument() {
        unsafe { std::env::set_var("CODERAG_CONFIG", "/from/env.toml") };
        let from_arg = resolve_config_path(Some(Path::new("/from/arg.toml")));
        let from_env = resolve_config_path(None);
        unsafe { std::env::remove_var("CODERAG_CONFIG") };
        let fallback = resolve_config_path(None);

        assert_eq!(from_arg, PathBuf::from("/from/arg.toml"));
        assert_eq!(from_env, PathBuf::from("/from/env.toml"));
        assert_eq!(fallback, PathBuf::from("config/default.toml"));
    }

    #[test]
    fn render_config_redacts_credentials() {
        let mut config = Config::load(Path::new("/nonexistent")).unwrap();
        config.secrets.embedding_api_key = Some(Secret::new("zk-live"));
        let rendered = render_config(&config).unwrap();
        assert!(!rendered.contains("zk-live"));
        assert!(rendered.contains("# ZHIPUAI_API_KEY = [REDACTED]"));
        assert!(rendered.contains("# MOONSHOT_API_KEY = <unset>"));
        assert!(rendered.contains("[retrieval]"));
    }

    #[test]
    fn config_command_does_not_need_repo_url() {
        let mut config = Config::default();
        config.source.repo_url = String::new();
        config.validate().unwrap();
        let rendered = render_config(&config).unwrap();
        assert!(rendered.contains("repo_url = \"\""));
    }

    #[tokio::test]
    #[serial]
    async fn build_vault_reads_explicit_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CODERAG_MAIN_TEST_KEY=abc").unwrap();
        unsafe { std::env::remove_var("CODERAG_MAIN_TEST_KEY") };

        let vault = build_vault(Some(file.path())).unwrap();
        let value = vault.get_secret("CODERAG_MAIN_TEST_KEY").await.unwrap();
        assert_eq!(value.as_deref(), Some("abc"));
    }

    #[test]
    fn build_vault_missing_explicit_file_errors() {
        assert!(build_vault(Some(Path::new("/nonexistent/.env"))).is_err());
    }

    #[tokio::test]
    async fn query_without_credentials_fails_before_loading_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.index.path = dir.path().join("index").to_string_lossy().into_owned();
        let err = run_query(&config, Some("q"), true).await.unwrap_err();
        assert!(err.to_string().contains("missing credential"));
    }
}
