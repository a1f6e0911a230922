// ABOUTME: Container recovery helpers used by rollback and cleanup.
// ABOUTME: Restarts a previous container or stops and removes a replaced one.

use std::time::Duration;

use crate::runtime::traits::{ContainerError, ContainerOps};
use crate::types::ContainerId;

use super::DeployError;

/// Bring a previously stopped container back into service.
///
/// A container that is already running counts as restored.
pub async fn restart_previous<R>(runtime: &R, previous: &ContainerId) -> Result<(), DeployError>
where
    R: ContainerOps + ?Sized,
{
    match runtime.start_container(previous).await {
        Ok(()) | Err(ContainerError::AlreadyRunning(_)) => {
            tracing::info!(container = %previous.short(), "previous container restored");
            Ok(())
        }
        Err(e) => Err(DeployError::RollbackFailed(format!(
            "failed to restart {}: {}",
            previous.short(),
            e
        ))),
    }
}

/// Stop a container if it is running, then remove it.
pub async fn stop_and_remove<R>(
    runtime: &R,
    id: &ContainerId,
    timeout: Duration,
) -> Result<(), ContainerError>
where
    R: ContainerOps + ?Sized,
{
    match runtime.stop_container(id, timeout).await {
        Ok(()) | Err(ContainerError::NotRunning(_)) => {}
        Err(e) => return Err(e),
    }
    runtime.remove_container(id, true).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeRuntime;

    #[tokio::test]
    async fn restart_previous_accepts_running_container() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:old");
        let id = runtime.seed_container("shop", "acme/shop:old", &[], true);

        restart_previous(&runtime, &id).await.unwrap();
        assert!(runtime.is_running(&id));
    }

    #[tokio::test]
    async fn restart_previous_reports_missing_container() {
        let runtime = FakeRuntime::new();
        let err = restart_previous(&runtime, &ContainerId::new("gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::RollbackFailed(_)));
    }

    #[tokio::test]
    async fn stop_and_remove_handles_stopped_container() {
        let runtime = FakeRuntime::new();
        let id = runtime.seed_container("shop", "acme/shop:old", &[], false);

        stop_and_remove(&runtime, &id, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(runtime.state().containers.is_empty());
    }
}
