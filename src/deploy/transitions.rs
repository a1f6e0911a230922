// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::traits::{
    ContainerConfig, ContainerError, ContainerOps, ImageOps, MANAGED_LABEL, REPO_LABEL,
};
use crate::types::ContainerId;

use super::Deployment;
use super::error::DeployError;
use super::rollback::{restart_previous, stop_and_remove};
use super::state::{Completed, ImagePulled, Initialized, OldStopped, Started};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Deployment<T>, (Deployment<S>, DeployError)>;

impl<S> Deployment<S> {
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            image: self.image,
            settings: self.settings,
            old_container: self.old_container,
            state,
        }
    }
}

// =============================================================================
// Initialized -> ImagePulled
// =============================================================================

impl Deployment<Initialized> {
    /// Pull the target image. Nothing running is touched.
    ///
    /// When the registry cannot provide the image but the engine already holds
    /// it (a build whose push failed), the local copy is used and a warning is
    /// recorded.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::ImagePullFailed` when the image is neither
    /// pullable nor present locally, or `DeployError::Timeout`.
    #[must_use = "deployment state must be used"]
    pub async fn pull_image<R: ImageOps + ?Sized>(
        self,
        runtime: &R,
        diag: &mut Diagnostics,
    ) -> Result<Deployment<ImagePulled>, DeployError> {
        tracing::info!(image = %self.image, "pulling image");
        let pulled = tokio::time::timeout(
            self.settings.pull_timeout,
            runtime.pull_image(&self.image, self.settings.auth.as_ref()),
        )
        .await
        .map_err(|_| DeployError::Timeout {
            operation: "image pull",
            after: self.settings.pull_timeout,
        })?;

        if let Err(e) = pulled {
            let local = runtime
                .image_exists(&self.image)
                .await
                .map_err(|inspect| DeployError::ImagePullFailed(format!("{e}; {inspect}")))?;
            if !local {
                return Err(DeployError::ImagePullFailed(e.to_string()));
            }
            diag.warn(Warning::image_pull(format!(
                "{}; deploying local copy of {}",
                e, self.image
            )));
        }

        Ok(self.transition(ImagePulled))
    }
}

// =============================================================================
// ImagePulled -> OldStopped
// =============================================================================

impl Deployment<ImagePulled> {
    /// Stop (but keep) the container being replaced.
    ///
    /// A previous container that no longer exists is forgotten; one that was
    /// already stopped is kept so a rollback can still bring it back.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::ContainerStopFailed` if the old container is still
    /// running and cannot be stopped.
    #[must_use = "deployment state must be used"]
    pub async fn stop_old<R: ContainerOps + ?Sized>(
        mut self,
        runtime: &R,
    ) -> Result<Deployment<OldStopped>, DeployError> {
        let Some(old) = self.old_container.clone() else {
            return Ok(self.transition(OldStopped::default()));
        };

        tracing::info!(container = %old.short(), "stopping previous container");
        let stopped_running = match runtime
            .stop_container(&old, self.settings.stop_timeout)
            .await
        {
            Ok(()) => true,
            Err(ContainerError::NotRunning(_)) => false,
            Err(ContainerError::NotFound(_)) => {
                tracing::warn!(container = %old.short(), "previous container no longer exists");
                self.old_container = None;
                false
            }
            Err(e) => return Err(DeployError::ContainerStopFailed(e.to_string())),
        };

        Ok(self.transition(OldStopped { stopped_running }))
    }
}

// =============================================================================
// OldStopped -> Started
// =============================================================================

impl Deployment<OldStopped> {
    /// Create and start the new container.
    ///
    /// On failure the deployment is handed back so the caller can `rollback()`.
    /// A container that was created but failed to start is force-removed.
    #[must_use = "deployment state must be used"]
    pub async fn start_new<R: ContainerOps + ?Sized>(
        self,
        runtime: &R,
    ) -> TransitionResult<Started, OldStopped> {
        let config = self.container_config();
        let container_id = match runtime.create_container(&config).await {
            Ok(id) => id,
            Err(e) => return Err((self, DeployError::ContainerCreateFailed(e.to_string()))),
        };

        if let Err(e) = runtime.start_container(&container_id).await {
            if let Err(remove_err) = runtime.remove_container(&container_id, true).await {
                tracing::warn!(
                    container = %container_id.short(),
                    "failed to remove container that did not start: {}",
                    remove_err
                );
            }
            return Err((self, DeployError::ContainerStartFailed(e.to_string())));
        }

        tracing::info!(container = %container_id.short(), image = %self.image, "new container started");
        Ok(self.transition(Started { container_id }))
    }

    /// Restart the previous container, if there was one.
    ///
    /// Returns the container now serving, which is the previous one.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::RollbackFailed` if it cannot be restarted.
    pub async fn rollback<R: ContainerOps + ?Sized>(
        self,
        runtime: &R,
    ) -> Result<Option<ContainerId>, DeployError> {
        match self.old_container {
            Some(old) if self.state.stopped_running => {
                restart_previous(runtime, &old).await?;
                Ok(Some(old))
            }
            old => Ok(old),
        }
    }

    fn container_config(&self) -> ContainerConfig {
        let mut config = ContainerConfig::for_image(self.image.clone())
            .label(MANAGED_LABEL, "true")
            .label(REPO_LABEL, self.image.repository());
        config.ports = self.settings.ports.clone();
        config
    }
}

// =============================================================================
// Started -> Completed
// =============================================================================

impl Deployment<Started> {
    /// Remove the replaced container. Failures are recorded, never returned.
    pub async fn cleanup<R: ContainerOps + ?Sized>(
        self,
        runtime: &R,
        diag: &mut Diagnostics,
    ) -> Deployment<Completed> {
        if let Some(old) = &self.old_container
            && let Err(e) = stop_and_remove(runtime, old, self.settings.stop_timeout).await
        {
            diag.warn(Warning::container_removal(format!(
                "failed to remove previous container {}: {}",
                old.short(),
                e
            )));
        }

        let container_id = self.state.container_id.clone();
        self.transition(Completed { container_id })
    }
}
