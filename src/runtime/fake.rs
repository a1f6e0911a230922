// ABOUTME: In-memory runtime used by unit tests.
// ABOUTME: Tracks images and containers, records calls and injects failures.

use super::traits::sealed::Sealed;
use super::traits::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerOps, ContainerSummary, ImageError,
    ImageOps, ImageSummary, RegistryAuth, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct FakeImage {
    pub id: String,
    pub reference: String,
    pub created: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub running: bool,
    pub labels: HashMap<String, String>,
    pub created: i64,
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub images: Vec<FakeImage>,
    pub containers: Vec<FakeContainer>,
    pub calls: Vec<String>,
    pub build_contexts: Vec<(String, Vec<u8>)>,
    pub pushed: Vec<String>,
    pub fail_build: bool,
    pub fail_pull: bool,
    pub fail_push: bool,
    pub fail_remove_image: bool,
    /// Starting a container from this image fails.
    pub fail_start_image: Option<String>,
    pub test_exit_code: i64,
    pub build_delay: Option<Duration>,
    pub pull_delay: Option<Duration>,
    pub push_delay: Option<Duration>,
    pub wait_delay: Option<Duration>,
    clock: i64,
    next_id: u64,
}

impl FakeState {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:060x}", prefix, self.next_id)
    }

    fn container_mut(&mut self, id: &ContainerId) -> Option<&mut FakeContainer> {
        self.containers.iter_mut().find(|c| c.id == id.as_str())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    pub fn seed_image(&self, reference: &str) -> String {
        let mut state = self.state.lock();
        let id = state.fresh_id("sha256:");
        let created = state.tick();
        state.images.push(FakeImage {
            id: id.clone(),
            reference: reference.to_string(),
            created,
        });
        id
    }

    pub fn seed_container(
        &self,
        name: &str,
        image: &str,
        labels: &[(&str, &str)],
        running: bool,
    ) -> ContainerId {
        let mut state = self.state.lock();
        let id = state.fresh_id("c");
        let created = state.tick();
        state.containers.push(FakeContainer {
            id: id.clone(),
            name: name.to_string(),
            image: image.to_string(),
            running,
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            created,
        });
        ContainerId::new(id)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn running_images(&self) -> Vec<String> {
        self.state
            .lock()
            .containers
            .iter()
            .filter(|c| c.running)
            .map(|c| c.image.clone())
            .collect()
    }

    pub fn is_running(&self, id: &ContainerId) -> bool {
        self.state
            .lock()
            .containers
            .iter()
            .any(|c| c.id == id.as_str() && c.running)
    }

    pub fn has_image(&self, reference: &str) -> bool {
        self.state
            .lock()
            .images
            .iter()
            .any(|i| i.reference == reference || i.id == reference)
    }
}

impl Sealed for FakeRuntime {}

#[async_trait]
impl RuntimeInfo for FakeRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        Ok(RuntimeMetadata {
            name: "fake".to_string(),
            version: "0.0.0".to_string(),
            api_version: "1.0".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        Ok(())
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn build_image(&self, context: Vec<u8>, tag: &ImageRef) -> Result<(), ImageError> {
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(format!("build {}", tag));
            state.build_contexts.push((tag.to_string(), context));
            state.build_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_build {
            return Err(ImageError::BuildFailed(format!("{}: step 3/5 failed", tag)));
        }
        let reference = tag.to_string();
        state.images.retain(|i| i.reference != reference);
        let id = state.fresh_id("sha256:");
        let created = state.tick();
        state.images.push(FakeImage {
            id,
            reference,
            created,
        });
        Ok(())
    }

    async fn pull_image(
        &self,
        reference: &ImageRef,
        _auth: Option<&RegistryAuth>,
    ) -> Result<(), ImageError> {
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(format!("pull {}", reference));
            state.pull_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_pull {
            return Err(ImageError::PullFailed(format!("{}: manifest unknown", reference)));
        }
        let reference = reference.to_string();
        if !state.images.iter().any(|i| i.reference == reference) {
            let id = state.fresh_id("sha256:");
            let created = state.tick();
            state.images.push(FakeImage {
                id,
                reference,
                created,
            });
        }
        Ok(())
    }

    async fn push_image(
        &self,
        reference: &ImageRef,
        _auth: Option<&RegistryAuth>,
    ) -> Result<(), ImageError> {
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(format!("push {}", reference));
            state.push_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_push {
            return Err(ImageError::PushFailed(format!("{}: denied", reference)));
        }
        state.pushed.push(reference.to_string());
        Ok(())
    }

    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        let reference = reference.to_string();
        Ok(self.state.lock().images.iter().any(|i| i.reference == reference))
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageSummary>, ImageError> {
        let state = self.state.lock();
        Ok(state
            .images
            .iter()
            .filter(|i| {
                ImageRef::parse(&i.reference)
                    .map(|r| r.repository() == repository)
                    .unwrap_or(false)
            })
            .map(|i| ImageSummary {
                id: ImageId::new(i.id.clone()),
                tags: vec![i.reference.clone()],
                created: i.created,
            })
            .collect())
    }

    async fn remove_image(&self, image: &str, _force: bool) -> Result<(), ImageError> {
        let mut state = self.state.lock();
        state.calls.push(format!("remove_image {}", image));
        if state.fail_remove_image {
            return Err(ImageError::InUse(image.to_string()));
        }
        let before = state.images.len();
        state
            .images
            .retain(|i| i.id != image && i.reference != image);
        if state.images.len() == before {
            return Err(ImageError::NotFound(image.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let mut state = self.state.lock();
        let image = config.image.to_string();
        state.calls.push(format!("create {}", image));
        if !state.images.iter().any(|i| i.reference == image) {
            return Err(ContainerError::ImageNotFound(image));
        }
        let id = state.fresh_id("c");
        let created = state.tick();
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| format!("fake_{}", &id[id.len() - 6..]));
        state.containers.push(FakeContainer {
            id: id.clone(),
            name,
            image,
            running: false,
            labels: config.labels.clone(),
            created,
        });
        Ok(ContainerId::new(id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state.calls.push(format!("start {}", id.short()));
        let fail_image = state.fail_start_image.clone();
        let container = state
            .container_mut(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if fail_image.as_deref() == Some(container.image.as_str()) {
            return Err(ContainerError::Runtime(
                "port is already allocated".to_string(),
            ));
        }
        if container.running {
            return Err(ContainerError::AlreadyRunning(id.to_string()));
        }
        container.running = true;
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state.calls.push(format!("stop {}", id.short()));
        let container = state
            .container_mut(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if !container.running {
            return Err(ContainerError::NotRunning(id.to_string()));
        }
        container.running = false;
        Ok(())
    }

    async fn wait_container(&self, id: &ContainerId) -> Result<i64, ContainerError> {
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(format!("wait {}", id.short()));
            state.wait_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let code = state.test_exit_code;
        let container = state
            .container_mut(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        container.running = false;
        Ok(code)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state.calls.push(format!("remove {}", id.short()));
        let running = state
            .containers
            .iter()
            .find(|c| c.id == id.as_str())
            .map(|c| c.running)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if running && !force {
            return Err(ContainerError::Runtime(format!(
                "cannot remove running container {}",
                id.short()
            )));
        }
        state.containers.retain(|c| c.id != id.as_str());
        Ok(())
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let state = self.state.lock();
        Ok(state
            .containers
            .iter()
            .filter(|c| filters.all || c.running)
            .filter(|c| {
                filters
                    .labels
                    .iter()
                    .all(|(k, v)| c.labels.get(k) == Some(v))
            })
            .map(|c| ContainerSummary {
                id: ContainerId::new(c.id.clone()),
                name: c.name.clone(),
                image: c.image.clone(),
                state: if c.running { "running" } else { "exited" }.to_string(),
                created: c.created,
                labels: c.labels.clone(),
            })
            .collect())
    }
}
