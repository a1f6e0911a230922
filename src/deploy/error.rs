// ABOUTME: Error types for deployment operations.
// ABOUTME: Covers image pull, container lifecycle, rollback, timeout and cancellation.

use std::time::Duration;

/// Errors that can occur during deployment state transitions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Image pull failed.
    #[error("failed to pull image: {0}")]
    ImagePullFailed(String),

    /// Listing containers to find the previous deployment failed.
    #[error("failed to look up running containers: {0}")]
    LookupFailed(String),

    /// Container stop failed.
    #[error("failed to stop container: {0}")]
    ContainerStopFailed(String),

    /// Container creation failed.
    #[error("failed to create container: {0}")]
    ContainerCreateFailed(String),

    /// Container start failed.
    #[error("failed to start container: {0}")]
    ContainerStartFailed(String),

    /// Restarting the previous container failed.
    #[error("rollback failed: {0}")]
    RollbackFailed(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("deployment cancelled")]
    Cancelled,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// The registry could not provide the image.
    Pull,
    /// A container operation failed.
    Container,
    /// The previous container could not be brought back.
    Rollback,
    Timeout,
    Cancelled,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::ImagePullFailed(_) => DeployErrorKind::Pull,
            DeployError::LookupFailed(_)
            | DeployError::ContainerStopFailed(_)
            | DeployError::ContainerCreateFailed(_)
            | DeployError::ContainerStartFailed(_) => DeployErrorKind::Container,
            DeployError::RollbackFailed(_) => DeployErrorKind::Rollback,
            DeployError::Timeout { .. } => DeployErrorKind::Timeout,
            DeployError::Cancelled => DeployErrorKind::Cancelled,
        }
    }
}
