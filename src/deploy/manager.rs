// ABOUTME: Drives a deployment through its states with rollback on start failure.
// ABOUTME: Locates the container being replaced and reports each stage to an observer.

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::traits::{ContainerFilters, ContainerOps, ImageOps};
use crate::types::{ContainerId, ImageRef};

use super::deployment::{DeploySettings, Deployment};
use super::error::DeployError;

/// Externally visible steps of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    PullingImage,
    StoppingOld,
    StartingNew,
    CleaningUp,
}

/// Notified before each stage; returning `false` cancels the deployment.
pub trait StageObserver: Send + Sync {
    fn enter(&self, stage: DeployStage) -> bool;
}

impl<F> StageObserver for F
where
    F: Fn(DeployStage) -> bool + Send + Sync,
{
    fn enter(&self, stage: DeployStage) -> bool {
        self(stage)
    }
}

/// How a deployment that did not error ended.
#[derive(Debug)]
pub enum DeployOutcome {
    /// The new container is serving; `replaced` was removed.
    Deployed {
        container: ContainerId,
        replaced: Option<ContainerId>,
    },
    /// The new container could not take over; `restored` is serving again.
    RolledBack {
        restored: Option<ContainerId>,
        cause: DeployError,
    },
}

/// Replaces the running container of a repository with a new image.
#[derive(Debug, Clone)]
pub struct DeploymentManager {
    settings: DeploySettings,
}

impl DeploymentManager {
    pub fn new(settings: DeploySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    /// The container `image` would replace.
    ///
    /// A tracked container wins. Otherwise the most recently created running
    /// tinyci container labelled with the image's repository is used;
    /// containers tinyci did not start are never picked.
    pub async fn locate_previous<R: ContainerOps + ?Sized>(
        &self,
        runtime: &R,
        image: &ImageRef,
        tracked: Option<&ContainerId>,
    ) -> Result<Option<ContainerId>, DeployError> {
        if let Some(id) = tracked {
            return Ok(Some(id.clone()));
        }

        let running = runtime
            .list_containers(&ContainerFilters::for_repository(&image.repository()))
            .await
            .map_err(|e| DeployError::LookupFailed(e.to_string()))?;

        let newest = running
            .into_iter()
            .filter(|c| c.is_running())
            .filter(|c| {
                ImageRef::parse(&c.image)
                    .map(|r| r.same_repository(image))
                    .unwrap_or(false)
            })
            .max_by_key(|c| c.created);

        if let Some(c) = &newest {
            tracing::info!(
                container = %c.id.short(),
                image = %c.image,
                "no tracked deployment, replacing newest container of the repository"
            );
        }
        Ok(newest.map(|c| c.id))
    }

    /// Deploy `image`, replacing the current container.
    ///
    /// Only a failure to bring up the new container (or cancellation after the
    /// old one was stopped) rolls back; that is reported as
    /// [`DeployOutcome::RolledBack`]. Failures before anything was stopped are
    /// returned as errors.
    pub async fn deploy<R>(
        &self,
        runtime: &R,
        image: &ImageRef,
        tracked: Option<&ContainerId>,
        observer: &dyn StageObserver,
        diag: &mut Diagnostics,
    ) -> Result<DeployOutcome, DeployError>
    where
        R: ImageOps + ContainerOps + ?Sized,
    {
        if !observer.enter(DeployStage::PullingImage) {
            return Err(DeployError::Cancelled);
        }
        let previous = self.locate_previous(runtime, image, tracked).await?;
        let pulled = Deployment::new(image.clone(), self.settings.clone(), previous)
            .pull_image(runtime, diag)
            .await?;

        if !observer.enter(DeployStage::StoppingOld) {
            return Err(DeployError::Cancelled);
        }
        let stopped = pulled.stop_old(runtime).await?;

        let (stopped, cause) = if observer.enter(DeployStage::StartingNew) {
            match stopped.start_new(runtime).await {
                Ok(started) => {
                    let container = started.new_container().clone();
                    let replaced = started.old_container().cloned();

                    if observer.enter(DeployStage::CleaningUp) {
                        started.cleanup(runtime, diag).await;
                    } else if let Some(old) = &replaced {
                        diag.warn(Warning::cleanup_skipped(format!(
                            "cancelled before removing previous container {}",
                            old.short()
                        )));
                    }

                    return Ok(DeployOutcome::Deployed {
                        container,
                        replaced,
                    });
                }
                Err((stopped, e)) => (stopped, e),
            }
        } else {
            (stopped, DeployError::Cancelled)
        };

        tracing::warn!(image = %image, "rolling back: {}", cause);
        let restored = stopped.rollback(runtime).await?;
        Ok(DeployOutcome::RolledBack { restored, cause })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeRuntime;
    use crate::deploy::DeployErrorKind;
    use crate::diagnostics::WarningKind;
    use crate::runtime::traits::{MANAGED_LABEL, PortMapping, REPO_LABEL};
    use std::sync::Mutex;
    use std::time::Duration;

    fn manager() -> DeploymentManager {
        DeploymentManager::new(DeploySettings {
            ports: vec![PortMapping::parse("5000:5000").unwrap()],
            stop_timeout: Duration::from_secs(1),
            pull_timeout: Duration::from_secs(5),
            auth: None,
        })
    }

    fn proceed(_: DeployStage) -> bool {
        true
    }

    fn image(tag: &str) -> ImageRef {
        ImageRef::parse(&format!("acme/shop:{}", tag)).unwrap()
    }

    #[tokio::test]
    async fn replaces_tracked_container() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:old");
        let old = runtime.seed_container("shop", "acme/shop:old", &[], true);
        let mut diag = Diagnostics::default();

        let outcome = manager()
            .deploy(&runtime, &image("new"), Some(&old), &proceed, &mut diag)
            .await
            .unwrap();

        let (container, replaced) = match outcome {
            DeployOutcome::Deployed {
                container,
                replaced,
            } => (container, replaced),
            other => panic!("expected deployment, got {:?}", other),
        };
        assert_eq!(replaced, Some(old));
        assert!(runtime.is_running(&container));
        assert_eq!(runtime.state().containers.len(), 1);
        assert_eq!(runtime.running_images(), vec!["acme/shop:new".to_string()]);
    }

    #[tokio::test]
    async fn start_failure_restarts_previous_container() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:old");
        let old = runtime.seed_container("shop", "acme/shop:old", &[], true);
        runtime.state().fail_start_image = Some("acme/shop:new".to_string());
        let mut diag = Diagnostics::default();

        let outcome = manager()
            .deploy(&runtime, &image("new"), Some(&old), &proceed, &mut diag)
            .await
            .unwrap();

        let (restored, cause) = match outcome {
            DeployOutcome::RolledBack { restored, cause } => (restored, cause),
            other => panic!("expected rollback, got {:?}", other),
        };
        assert_eq!(restored.as_ref(), Some(&old));
        assert!(matches!(cause, DeployError::ContainerStartFailed(_)));
        assert!(runtime.is_running(&old));
        assert_eq!(runtime.state().containers.len(), 1);
    }

    #[tokio::test]
    async fn pull_failure_leaves_running_container_untouched() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:old");
        let old = runtime.seed_container("shop", "acme/shop:old", &[], true);
        runtime.state().fail_pull = true;
        let mut diag = Diagnostics::default();

        let err = manager()
            .deploy(&runtime, &image("new"), Some(&old), &proceed, &mut diag)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::ImagePullFailed(_)));
        assert!(runtime.is_running(&old));
        assert!(!runtime.calls().iter().any(|c| c.starts_with("stop")));
    }

    fn managed(repository: &'static str) -> [(&'static str, &'static str); 2] {
        [(MANAGED_LABEL, "true"), (REPO_LABEL, repository)]
    }

    #[tokio::test]
    async fn untracked_deploy_replaces_newest_matching_container() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:v1");
        runtime.seed_image("acme/shop:v2");
        runtime.seed_image("acme/blog:v1");
        let older = runtime.seed_container("a", "acme/shop:v1", &managed("acme/shop"), true);
        let newer = runtime.seed_container("b", "acme/shop:v2", &managed("acme/shop"), true);
        let other = runtime.seed_container("c", "acme/blog:v1", &managed("acme/blog"), true);

        let previous = manager()
            .locate_previous(&runtime, &image("v3"), None)
            .await
            .unwrap();

        assert_eq!(previous, Some(newer));
        assert!(runtime.is_running(&older));
        assert!(runtime.is_running(&other));
    }

    #[tokio::test]
    async fn untracked_deploy_ignores_containers_tinyci_did_not_start() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:v1");
        let ours = runtime.seed_container("a", "acme/shop:v1", &managed("acme/shop"), true);
        runtime.seed_container("hand-started", "acme/shop:v1", &[], true);

        let previous = manager()
            .locate_previous(&runtime, &image("v2"), None)
            .await
            .unwrap();
        assert_eq!(previous, Some(ours));

        let bare = FakeRuntime::new();
        bare.seed_image("acme/shop:v1");
        bare.seed_container("hand-started", "acme/shop:v1", &[], true);
        let previous = manager()
            .locate_previous(&bare, &image("v2"), None)
            .await
            .unwrap();
        assert_eq!(previous, None);
    }

    #[tokio::test]
    async fn unpushed_local_image_is_deployed_with_a_warning() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:new");
        runtime.state().fail_pull = true;
        let mut diag = Diagnostics::default();

        let outcome = manager()
            .deploy(&runtime, &image("new"), None, &proceed, &mut diag)
            .await
            .unwrap();

        assert!(matches!(outcome, DeployOutcome::Deployed { .. }));
        assert_eq!(runtime.running_images(), vec!["acme/shop:new".to_string()]);
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(diag.warnings()[0].kind, WarningKind::ImagePull);
    }

    #[tokio::test]
    async fn pull_timeout_leaves_running_container_untouched() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:old");
        let old = runtime.seed_container("shop", "acme/shop:old", &managed("acme/shop"), true);
        runtime.state().pull_delay = Some(Duration::from_secs(30));
        let mut settings = manager().settings().clone();
        settings.pull_timeout = Duration::from_millis(20);
        let mut diag = Diagnostics::default();

        let err = DeploymentManager::new(settings)
            .deploy(&runtime, &image("new"), Some(&old), &proceed, &mut diag)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::Timeout {
                operation: "image pull",
                ..
            }
        ));
        assert_eq!(err.kind(), DeployErrorKind::Timeout);
        assert!(runtime.is_running(&old));
        assert!(!runtime.calls().iter().any(|c| c.starts_with("stop")));
    }

    #[tokio::test]
    async fn cancel_before_stop_aborts_without_side_effects() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:old");
        let old = runtime.seed_container("shop", "acme/shop:old", &[], true);
        let mut diag = Diagnostics::default();
        let cancel_at_stop = |stage: DeployStage| stage != DeployStage::StoppingOld;

        let err = manager()
            .deploy(&runtime, &image("new"), Some(&old), &cancel_at_stop, &mut diag)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::Cancelled));
        assert!(runtime.is_running(&old));
        assert_eq!(runtime.state().containers.len(), 1);
    }

    #[tokio::test]
    async fn cancel_after_stop_rolls_back() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:old");
        let old = runtime.seed_container("shop", "acme/shop:old", &[], true);
        let mut diag = Diagnostics::default();
        let seen = Mutex::new(Vec::new());
        let cancel_at_start = |stage: DeployStage| {
            seen.lock().unwrap().push(stage);
            stage != DeployStage::StartingNew
        };

        let outcome = manager()
            .deploy(&runtime, &image("new"), Some(&old), &cancel_at_start, &mut diag)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            DeployOutcome::RolledBack {
                cause: DeployError::Cancelled,
                ..
            }
        ));
        assert!(runtime.is_running(&old));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                DeployStage::PullingImage,
                DeployStage::StoppingOld,
                DeployStage::StartingNew
            ]
        );
    }

    #[tokio::test]
    async fn cancel_at_cleanup_keeps_new_container_and_warns() {
        let runtime = FakeRuntime::new();
        runtime.seed_image("acme/shop:old");
        let old = runtime.seed_container("shop", "acme/shop:old", &[], true);
        let mut diag = Diagnostics::default();
        let cancel_at_cleanup = |stage: DeployStage| stage != DeployStage::CleaningUp;

        let outcome = manager()
            .deploy(&runtime, &image("new"), Some(&old), &cancel_at_cleanup, &mut diag)
            .await
            .unwrap();

        assert!(matches!(outcome, DeployOutcome::Deployed { .. }));
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(runtime.state().containers.len(), 2);
    }
}
