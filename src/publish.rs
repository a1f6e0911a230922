// ABOUTME: Builds production images from a working copy and pushes them to the registry.
// ABOUTME: Images are tagged <namespace>/<repo>:<short sha>.

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::runtime::build_context;
use crate::runtime::traits::{ImageError, ImageOps, RegistryAuth};
use crate::types::{CommitSha, ImageRef, RepoName};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to pack build context: {0}")]
    Context(#[source] std::io::Error),

    #[error("image build failed: {0}")]
    Build(#[source] ImageError),

    #[error("registry push failed: {0}")]
    Registry(#[source] ImageError),

    #[error("{operation} of {image} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        image: String,
        after: Duration,
    },
}

/// Builds and pushes release images.
#[derive(Debug, Clone)]
pub struct ImagePublisher {
    namespace: String,
    auth: Option<RegistryAuth>,
    build_timeout: Duration,
    push_timeout: Duration,
}

impl ImagePublisher {
    pub fn new(
        namespace: impl Into<String>,
        auth: Option<RegistryAuth>,
        build_timeout: Duration,
        push_timeout: Duration,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            auth,
            build_timeout,
            push_timeout,
        }
    }

    /// The release image for `repo` at `sha`.
    pub fn image_for(&self, repo: &RepoName, sha: &CommitSha) -> ImageRef {
        ImageRef::new(
            Some(&self.namespace),
            &repo.image_name(),
            Some(sha.as_str()),
        )
    }

    /// Build `image` with `repo_dir` as the build context.
    pub async fn build<R>(
        &self,
        runtime: &R,
        repo_dir: &Path,
        image: &ImageRef,
    ) -> Result<(), PublishError>
    where
        R: ImageOps + ?Sized,
    {
        let context = build_context::archive(repo_dir).map_err(PublishError::Context)?;
        tracing::info!(image = %image, context_bytes = context.len(), "building image");

        tokio::time::timeout(self.build_timeout, runtime.build_image(context, image))
            .await
            .map_err(|_| PublishError::Timeout {
                operation: "build",
                image: image.to_string(),
                after: self.build_timeout,
            })?
            .map_err(PublishError::Build)
    }

    pub async fn push<R>(&self, runtime: &R, image: &ImageRef) -> Result<(), PublishError>
    where
        R: ImageOps + ?Sized,
    {
        tracing::info!(image = %image, "pushing image");

        tokio::time::timeout(
            self.push_timeout,
            runtime.push_image(image, self.auth.as_ref()),
        )
        .await
        .map_err(|_| PublishError::Timeout {
            operation: "push",
            image: image.to_string(),
            after: self.push_timeout,
        })?
        .map_err(PublishError::Registry)
    }
}
