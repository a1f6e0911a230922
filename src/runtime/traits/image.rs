// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Build, pull, push, list and remove container images.

use super::sealed::Sealed;
use super::shared_types::{ImageSummary, RegistryAuth};
use crate::types::ImageRef;
use async_trait::async_trait;

#[async_trait]
pub trait ImageOps: Sealed + Send + Sync {
    /// Build an image from a tar build context containing a `Dockerfile`.
    async fn build_image(&self, context: Vec<u8>, tag: &ImageRef) -> Result<(), ImageError>;

    async fn pull_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<(), ImageError>;

    /// Push an image to its registry, logging each progress line.
    async fn push_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<(), ImageError>;

    /// Whether the engine holds `reference` locally.
    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError>;

    /// List local images of a repository (`namespace/name`, any tag).
    async fn list_images(&self, repository: &str) -> Result<Vec<ImageSummary>, ImageError>;

    /// Remove an image by ID or reference.
    async fn remove_image(&self, image: &str, force: bool) -> Result<(), ImageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("build failed: {0}")]
    BuildFailed(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("push failed: {0}")]
    PushFailed(String),

    #[error("image {0} is used by a container")]
    InUse(String),

    #[error("container engine error: {0}")]
    Runtime(String),
}
