// ABOUTME: Container runtime access for Docker and Podman.
// ABOUTME: Detection, connection, capability traits and build-context packing.

mod bollard;
pub mod build_context;
mod detection;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use detection::{DetectionError, detect_local, resolve};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::{ContainerOps, ImageOps, RuntimeInfo};
pub use types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};

use snafu::ResultExt;

/// Everything the pipelines need from a runtime.
pub trait Runtime: ImageOps + ContainerOps + RuntimeInfo + 'static {}

impl<T> Runtime for T where T: ImageOps + ContainerOps + RuntimeInfo + 'static {}

/// Resolve the configured (or detected) local runtime and verify it answers.
pub async fn connect_local(config: &RuntimeConfig) -> Result<BollardRuntime, RuntimeError> {
    let endpoint = resolve(config).context(error::DetectionSnafu)?;
    tracing::debug!(
        runtime = %endpoint.runtime_type,
        socket = %endpoint.socket_path,
        "connecting to container runtime"
    );
    let runtime = BollardRuntime::connect(&endpoint).context(error::ConnectionSnafu)?;
    runtime.ping().await.context(error::ConnectionSnafu)?;
    Ok(runtime)
}
