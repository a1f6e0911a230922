// ABOUTME: Pipeline error aggregating every component failure.
// ABOUTME: Exposes a coarse kind for status reporting.

use serde::Serialize;
use thiserror::Error;

use super::PipelineStatus;
use crate::deploy::{DeployError, DeployErrorKind};
use crate::git::GitError;
use crate::publish::PublishError;
use crate::testrunner::TestRunError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("another pipeline is in progress ({0})")]
    Busy(PipelineStatus),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    TestRun(#[from] TestRunError),

    #[error("tests failed with exit code {exit_code}")]
    TestFailure { exit_code: i64 },

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("pipeline cancelled")]
    Cancelled,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineErrorKind {
    Git,
    Build,
    TestFailure,
    Registry,
    Deploy,
    Timeout,
    Cancelled,
    Unsupported,
    Busy,
    InvalidRequest,
}

impl PipelineError {
    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            PipelineError::Busy(_) => PipelineErrorKind::Busy,
            PipelineError::InvalidRequest(_) => PipelineErrorKind::InvalidRequest,
            PipelineError::Git(GitError::Timeout { .. }) => PipelineErrorKind::Timeout,
            PipelineError::Git(_) => PipelineErrorKind::Git,
            PipelineError::TestRun(e) => match e {
                TestRunError::UnsupportedProject(_) => PipelineErrorKind::Unsupported,
                TestRunError::Timeout { .. } => PipelineErrorKind::Timeout,
                _ => PipelineErrorKind::Build,
            },
            PipelineError::TestFailure { .. } => PipelineErrorKind::TestFailure,
            PipelineError::Publish(e) => match e {
                PublishError::Registry(_) => PipelineErrorKind::Registry,
                PublishError::Timeout { .. } => PipelineErrorKind::Timeout,
                _ => PipelineErrorKind::Build,
            },
            PipelineError::Deploy(e) => match e.kind() {
                DeployErrorKind::Pull => PipelineErrorKind::Registry,
                DeployErrorKind::Timeout => PipelineErrorKind::Timeout,
                DeployErrorKind::Cancelled => PipelineErrorKind::Cancelled,
                DeployErrorKind::Container | DeployErrorKind::Rollback => {
                    PipelineErrorKind::Deploy
                }
            },
            PipelineError::Cancelled => PipelineErrorKind::Cancelled,
        }
    }
}
