// ABOUTME: Bounds how many release images are kept and stops managed containers.
// ABOUTME: Failures are recorded as diagnostics, never returned.

use std::time::Duration;

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::traits::{ContainerFilters, ContainerOps, ImageOps};

/// Keeps the newest `keep` images of a repository.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    keep: usize,
}

impl RetentionPolicy {
    pub fn new(keep: usize) -> Self {
        Self { keep }
    }

    /// Remove all but the `keep` most recently created images of `repository`.
    ///
    /// Returns how many images were removed.
    pub async fn prune<R: ImageOps + ?Sized>(
        &self,
        runtime: &R,
        repository: &str,
        diag: &mut Diagnostics,
    ) -> usize {
        let mut images = match runtime.list_images(repository).await {
            Ok(images) => images,
            Err(e) => {
                diag.warn(Warning::image_prune(format!(
                    "failed to list images of {}: {}",
                    repository, e
                )));
                return 0;
            }
        };

        if images.len() <= self.keep {
            return 0;
        }

        images.sort_by_key(|image| image.created);
        let excess = images.len() - self.keep;

        let mut removed = 0;
        for image in &images[..excess] {
            match runtime.remove_image(image.id.as_str(), true).await {
                Ok(()) => {
                    tracing::info!(image = %image.id.short(), tags = ?image.tags, "pruned image");
                    removed += 1;
                }
                Err(e) => diag.warn(Warning::image_prune(format!(
                    "failed to remove image {}: {}",
                    image.id.short(),
                    e
                ))),
            }
        }
        removed
    }
}

/// Stop every running container tinyci started. Returns how many were stopped.
pub async fn stop_all<R: ContainerOps + ?Sized>(
    runtime: &R,
    timeout: Duration,
    diag: &mut Diagnostics,
) -> usize {
    let containers = match runtime.list_containers(&ContainerFilters::managed()).await {
        Ok(containers) => containers,
        Err(e) => {
            diag.warn(Warning::container_stop(format!(
                "failed to list managed containers: {}",
                e
            )));
            return 0;
        }
    };

    let mut stopped = 0;
    for container in containers.iter().filter(|c| c.is_running()) {
        match runtime.stop_container(&container.id, timeout).await {
            Ok(()) => {
                tracing::info!(container = %container.id.short(), name = %container.name, "stopped");
                stopped += 1;
            }
            Err(e) => diag.warn(Warning::container_stop(format!(
                "failed to stop {}: {}",
                container.id.short(),
                e
            ))),
        }
    }
    stopped
}
