//! Materializes the remote repository into a local working directory.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum SourceFetchError {
    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git clone exited with {status}: {stderr}")]
    CloneFailed { status: String, stderr: String },
}

/// Produces a local copy of a repository.
pub trait SourceFetcher: Send + Sync {
    /// Replace `local_path` with a fresh copy of `url` and return it.
    fn fetch(
        &self,
        url: &str,
        local_path: &Path,
    ) -> impl Future<Output = Result<PathBuf, SourceFetchError>> + Send;
}

/// Shallow `git clone` through the system `git` binary.
#[derive(Debug, Clone, Default)]
pub struct GitFetcher {
    branch: Option<String>,
    program: Option<PathBuf>,
}

impl GitFetcher {
    #[must_use]
    pub fn new(branch: Option<String>) -> Self {
        Self {
            branch,
            program: None,
        }
    }

    /// Use a different executable in place of `git`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    fn clone_args(&self, url: &str, local_path: &Path) -> Vec<String> {
        let mut args = vec!["clone".to_owned(), "--depth".to_owned(), "1".to_owned()];
        if let Some(branch) = &self.branch {
            args.push("--branch".to_owned());
            args.push(branch.clone());
        }
        args.push("--".to_owned());
        args.push(url.to_owned());
        args.push(local_path.to_string_lossy().into_owned());
        args
    }
}

impl SourceFetcher for GitFetcher {
    async fn fetch(&self, url: &str, local_path: &Path) -> Result<PathBuf, SourceFetchError> {
        remove_dir_all_forced(local_path).await?;
        if let Some(parent) = local_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SourceFetchError::Remove {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tracing::info!(url, path = %local_path.display(), branch = ?self.branch, "cloning repository");
        let program = self
            .program
            .as_deref()
            .unwrap_or_else(|| Path::new("git"));
        let output = Command::new(program)
            .args(self.clone_args(url, local_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(SourceFetchError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            tracing::error!(url, status = %output.status, "git clone failed");
            return Err(SourceFetchError::CloneFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        tracing::info!(path = %local_path.display(), "repository cloned");
        Ok(local_path.to_path_buf())
    }
}

/// Remove `path` recursively. A missing path is not an error.
///
/// If the first attempt fails, write permission is restored on every entry
/// (git marks pack files read-only on some platforms) and removal is retried
/// once.
///
/// # Errors
///
/// Returns [`SourceFetchError::Remove`] if the path still cannot be removed.
pub async fn remove_dir_all_forced(path: &Path) -> Result<(), SourceFetchError> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(SourceFetchError::Remove {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !meta.is_dir() {
        return tokio::fs::remove_file(path)
            .await
            .map_err(|source| SourceFetchError::Remove {
                path: path.to_path_buf(),
                source,
            });
    }

    if let Err(first) = tokio::fs::remove_dir_all(path).await {
        tracing::debug!(path = %path.display(), error = %first, "retrying removal after clearing read-only bits");
        let owned = path.to_path_buf();
        let _ = tokio::task::spawn_blocking(move || make_writable(&owned)).await;
        tokio::fs::remove_dir_all(path)
            .await
            .map_err(|source| SourceFetchError::Remove {
                path: path.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

fn make_writable(path: &Path) {
    if let Ok(meta) = std::fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() {
            return;
        }
        let mut perms = meta.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        let _ = std::fs::set_permissions(path, perms);
        if meta.is_dir()
            && let Ok(entries) = std::fs::read_dir(path)
        {
            for entry in entries.flatten() {
                make_writable(&entry.path());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_args_without_branch() {
        let fetcher = GitFetcher::new(None);
        let args = fetcher.clone_args("https://example.com/r.git", Path::new("repos"));
        assert_eq!(
            args,
            ["clone", "--depth", "1", "--", "https://example.com/r.git", "repos"]
        );
    }

    #[test]
    fn clone_args_with_branch() {
        let fetcher = GitFetcher::new(Some("dev".into()));
        let args = fetcher.clone_args("u", Path::new("p"));
        assert_eq!(
            args,
            ["clone", "--depth", "1", "--branch", "dev", "--", "u", "p"]
        );
    }

    #[test]
    fn option_like_url_stays_positional() {
        let fetcher = GitFetcher::new(None);
        let args = fetcher.clone_args("--upload-pack=touch pwned", Path::new("-repo"));
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(&args[sep + 1..], ["--upload-pack=touch pwned", "-repo"]);
        assert!(args[..sep].iter().all(|a| !a.starts_with("--upload-pack")));
    }

    #[tokio::test]
    async fn remove_missing_path_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_dir_all_forced(&dir.path().join("absent"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_clears_read_only_tree() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("repo");
        std::fs::create_dir_all(target.join("objects")).unwrap();
        let file = target.join("objects/pack");
        std::fs::write(&file, "data").unwrap();
        let mut perms = std::fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&file, perms).unwrap();

        remove_dir_all_forced(&target).await.unwrap();
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = GitFetcher::new(None).with_program("/nonexistent/coderag-git");
        let err = fetcher
            .fetch("https://example.com/r.git", &dir.path().join("repo"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceFetchError::Spawn(_)));
    }

    #[tokio::test]
    async fn fetch_replaces_existing_contents_before_cloning() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("repo");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("stale.txt"), "old").unwrap();

        let fetcher = GitFetcher::new(None).with_program("/nonexistent/coderag-git");
        let _ = fetcher.fetch("u", &target).await;
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_clone_failed() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = GitFetcher::new(None).with_program("false");
        let err = fetcher.fetch("u", &dir.path().join("repo")).await.unwrap_err();
        assert!(matches!(err, SourceFetchError::CloneFailed { .. }));
    }
}
