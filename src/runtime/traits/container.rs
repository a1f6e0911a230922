// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Create, start, stop, wait for, remove and list containers.

use super::sealed::Sealed;
use super::shared_types::{ContainerConfig, MANAGED_LABEL, REPO_LABEL};
use crate::types::ContainerId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    /// Start a created or stopped container.
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Stop a container, killing it once `timeout` has passed.
    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    /// Block until the container exits and return its exit code.
    async fn wait_container(&self, id: &ContainerId) -> Result<i64, ContainerError>;

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;
}

/// Selects containers whose labels contain every `labels` pair.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    pub labels: HashMap<String, String>,
    /// Also list stopped containers.
    pub all: bool,
}

impl ContainerFilters {
    /// Running containers started by tinyci.
    pub fn managed() -> Self {
        let mut labels = HashMap::new();
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
        Self { labels, all: false }
    }

    /// Running containers started by tinyci for one image repository.
    pub fn for_repository(repository: &str) -> Self {
        let mut filters = Self::managed();
        filters
            .labels
            .insert(REPO_LABEL.to_string(), repository.to_string());
        filters
    }
}

/// A container as reported by a listing.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    pub name: String,
    /// Image reference the container was created from.
    pub image: String,
    /// Lowercase engine state, e.g. `running` or `exited`.
    pub state: String,
    /// Seconds since the epoch.
    pub created: i64,
    pub labels: HashMap<String, String>,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("container engine error: {0}")]
    Runtime(String),
}
