// ABOUTME: Engine identity and liveness probe.
// ABOUTME: Used once at startup to verify the socket answers.

use super::sealed::Sealed;
use super::shared_types::RuntimeMetadata;
use async_trait::async_trait;

#[async_trait]
pub trait RuntimeInfo: Sealed + Send + Sync {
    /// Engine name, version and platform.
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError>;

    async fn ping(&self) -> Result<(), RuntimeInfoError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("cannot reach container engine: {0}")]
    ConnectionFailed(String),

    #[error("container engine error: {0}")]
    Runtime(String),
}
