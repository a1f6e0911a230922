// ABOUTME: Error type for repository synchronization.
// ABOUTME: Wraps git subprocess failures with their captured stderr.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::CommitShaError;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("`git {command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`git {command}` timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("working copy {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("unexpected HEAD hash: {0}")]
    InvalidSha(#[from] CommitShaError),
}
