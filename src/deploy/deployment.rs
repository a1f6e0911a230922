// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: Holds the target image, deploy settings and the container being replaced.

use std::time::Duration;

use crate::runtime::traits::{PortMapping, RegistryAuth};
use crate::types::{ContainerId, ImageRef};

use super::state::{Completed, Initialized, Started};

/// Settings shared by every deployment.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub ports: Vec<PortMapping>,
    pub stop_timeout: Duration,
    pub pull_timeout: Duration,
    pub auth: Option<RegistryAuth>,
}

/// A deployment in progress, parameterized by its current state.
///
/// The state type parameter `S` carries state-specific data, so the new
/// container's ID only exists on states where a container has been started.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) image: ImageRef,
    pub(crate) settings: DeploySettings,
    pub(crate) old_container: Option<ContainerId>,
    pub(crate) state: S,
}

impl Deployment<Initialized> {
    /// Start a deployment of `image`, replacing `old_container` if given.
    pub fn new(image: ImageRef, settings: DeploySettings, old_container: Option<ContainerId>) -> Self {
        Deployment {
            image,
            settings,
            old_container,
            state: Initialized,
        }
    }
}

impl<S> Deployment<S> {
    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    /// The container being replaced (None on first deploy).
    pub fn old_container(&self) -> Option<&ContainerId> {
        self.old_container.as_ref()
    }
}

impl Deployment<Started> {
    pub fn new_container(&self) -> &ContainerId {
        &self.state.container_id
    }
}

impl Deployment<Completed> {
    pub fn deployed_container(&self) -> &ContainerId {
        &self.state.container_id
    }
}
