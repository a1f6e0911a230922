// ABOUTME: Repository synchronization through the git executable.
// ABOUTME: Clones or fast-forwards a working copy and reports its short HEAD hash.

mod error;

pub use error::GitError;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::types::CommitSha;

/// Keeps a local working copy in step with a remote repository.
#[async_trait]
pub trait SourceControl: Send + Sync + 'static {
    /// Bring `dir` up to date with `url` and return the short hash of `HEAD`.
    async fn sync(&self, url: &str, dir: &Path) -> Result<CommitSha, GitError>;
}

/// [`SourceControl`] backed by the `git` command line.
///
/// Syncs of the same directory are serialized; different directories proceed
/// independently.
pub struct GitCli {
    timeout: Duration,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(dir.to_path_buf())
            .or_default()
            .clone()
    }

    /// Whether `dir` is the root of a usable working copy.
    ///
    /// A `.git` entry is required so a directory nested inside some other
    /// repository is not mistaken for one.
    async fn is_working_copy(&self, dir: &Path) -> bool {
        if !dir.join(".git").exists() {
            return false;
        }
        match self.git(dir, &["rev-parse", "--is-inside-work-tree"]).await {
            Ok(out) => out.trim() == "true",
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "not a git working copy");
                false
            }
        }
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        let command = args.join(" ");
        tracing::debug!(dir = %dir.display(), "git {}", command);

        let child = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| GitError::Timeout {
                command: command.clone(),
                after: self.timeout,
            })?
            .map_err(GitError::Spawn)?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn sync(&self, url: &str, dir: &Path) -> Result<CommitSha, GitError> {
        let lock = self.lock_for(dir);
        let _guard = lock.lock().await;

        let io_err = |source: std::io::Error| GitError::Io {
            path: dir.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
        if !tokio::fs::metadata(dir).await.map_err(io_err)?.is_dir() {
            return Err(GitError::NotADirectory(dir.to_path_buf()));
        }

        if self.is_working_copy(dir).await {
            tracing::info!(dir = %dir.display(), "pulling latest changes");
            self.git(dir, &["pull", "--ff-only"]).await?;
        } else {
            tracing::info!(dir = %dir.display(), url, "cloning repository");
            tokio::fs::remove_dir_all(dir).await.map_err(io_err)?;
            tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
            self.git(dir, &["clone", "--", url, "."]).await?;
        }

        let head = self.git(dir, &["rev-parse", "--short", "HEAD"]).await?;
        Ok(CommitSha::new(&head)?)
    }
}
