// ABOUTME: Sequences git, tests, publishing, deployment and retention into pipelines.
// ABOUTME: One shared handle owns the run record; at most one pipeline runs at a time.

use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::error::PipelineError;
use super::record::{Details, LastDeployment, PipelineRun, RepoBinding, Trigger};
use super::slot::RunSlot;
use super::status::PipelineStatus;
use crate::config::Config;
use crate::deploy::{DeployOutcome, DeploySettings, DeployStage, DeploymentManager};
use crate::diagnostics::Diagnostics;
use crate::git::SourceControl;
use crate::project::{self, ProjectType};
use crate::publish::ImagePublisher;
use crate::retention::{self, RetentionPolicy};
use crate::runtime::Runtime;
use crate::testrunner::TestRunner;
use crate::types::{CommitSha, ContainerId, ImageRef, RepoName};

/// Result of a CI run that got as far as building the release image.
#[derive(Debug, Clone)]
pub struct CiOutcome {
    pub image: ImageRef,
    pub commit: CommitSha,
    pub project_type: ProjectType,
    /// False when the push failed; the image still exists locally.
    pub pushed: bool,
}

/// Result of a successful deploy run.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub container: ContainerId,
    pub replaced: Option<ContainerId>,
    pub pruned: usize,
}

struct Inner<R, S> {
    runtime: R,
    source: S,
    record: Arc<RwLock<PipelineRun>>,
    pipeline_dir: PathBuf,
    deployments_dir: PathBuf,
    test_runner: TestRunner,
    publisher: ImagePublisher,
    deployer: DeploymentManager,
    retention: RetentionPolicy,
}

/// Shared handle to the pipeline engine. Clones refer to the same engine.
pub struct Orchestrator<R, S> {
    inner: Arc<Inner<R, S>>,
}

impl<R, S> Clone for Orchestrator<R, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CiRequest {
    repo: RepoName,
    url: String,
    directory: PathBuf,
}

impl<R: Runtime, S: SourceControl> Orchestrator<R, S> {
    pub fn new(config: &Config, runtime: R, source: S) -> crate::error::Result<Self> {
        let auth = config.registry_auth()?;
        let timeouts = &config.timeouts;

        Ok(Self {
            inner: Arc::new(Inner {
                runtime,
                source,
                record: Arc::new(RwLock::new(PipelineRun::default())),
                pipeline_dir: config.pipeline_dir().to_path_buf(),
                deployments_dir: config.deployments_dir(),
                test_runner: TestRunner::new(
                    config.test_image_prefix.clone(),
                    config.templates_dir(),
                    timeouts.build,
                    timeouts.test,
                ),
                publisher: ImagePublisher::new(
                    config.namespace.clone(),
                    auth.clone(),
                    timeouts.build,
                    timeouts.push,
                ),
                deployer: DeploymentManager::new(DeploySettings {
                    ports: config.deploy.port_mappings(),
                    stop_timeout: config.deploy.stop_timeout,
                    pull_timeout: timeouts.pull,
                    auth,
                }),
                retention: RetentionPolicy::new(config.retention.keep_images),
            }),
        })
    }

    pub fn runtime(&self) -> &R {
        &self.inner.runtime
    }

    pub fn status(&self) -> PipelineStatus {
        self.inner.record.read().status
    }

    pub fn details(&self) -> Details {
        Details::capture(
            &self.inner.record.read(),
            self.inner.pipeline_dir.clone(),
            self.inner.deployments_dir.clone(),
        )
    }

    pub fn last_deployment(&self) -> LastDeployment {
        LastDeployment::capture(&self.inner.record.read())
    }

    /// Ask the in-flight run to stop at its next stage boundary.
    ///
    /// Returns false when nothing is running.
    pub fn cancel(&self) -> bool {
        let mut run = self.inner.record.write();
        if run.status.is_idle() {
            return false;
        }
        tracing::info!(status = %run.status, "cancellation requested");
        run.cancel_requested = true;
        true
    }

    // =========================================================================
    // CI pipeline
    // =========================================================================

    /// Sync, test, build and push `repo_name` from `repo_url`.
    pub async fn run_ci(&self, repo_url: &str, repo_name: &str) -> Result<CiOutcome, PipelineError> {
        let (slot, request) = self.claim_ci(repo_url, repo_name)?;
        self.execute_ci(slot, request).await
    }

    /// Like [`run_ci`](Self::run_ci) but returns once the run is accepted.
    pub fn trigger_ci(&self, repo_url: &str, repo_name: &str) -> Trigger {
        match self.claim_ci(repo_url, repo_name) {
            Ok((slot, request)) => {
                let this = self.clone();
                tokio::spawn(async move {
                    let _ = this.execute_ci(slot, request).await;
                });
                Trigger::accepted()
            }
            Err(e) => Trigger::rejected(&e),
        }
    }

    fn claim_ci(&self, repo_url: &str, repo_name: &str) -> Result<(RunSlot, CiRequest), PipelineError> {
        let repo = RepoName::new(repo_name)
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
        let url = repo_url.trim();
        if url.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "repository URL cannot be empty".to_string(),
            ));
        }

        let request = CiRequest {
            directory: self.inner.deployments_dir.join(repo.as_str()),
            url: url.to_string(),
            repo,
        };
        let binding = RepoBinding {
            name: request.repo.clone(),
            url: request.url.clone(),
            directory: request.directory.clone(),
        };
        let slot = RunSlot::claim(&self.inner.record, PipelineStatus::Triggered, Some(binding))?;
        Ok((slot, request))
    }

    async fn execute_ci(&self, slot: RunSlot, request: CiRequest) -> Result<CiOutcome, PipelineError> {
        let mut diag = Diagnostics::default();
        let result = self.ci_stages(&slot, &request, &mut diag).await;
        slot.finish(diag, result.as_ref().err());
        result
    }

    async fn ci_stages(
        &self,
        slot: &RunSlot,
        request: &CiRequest,
        diag: &mut Diagnostics,
    ) -> Result<CiOutcome, PipelineError> {
        let inner = &*self.inner;

        slot.enter(PipelineStatus::PullingCode)?;
        let commit = inner.source.sync(&request.url, &request.directory).await?;
        tracing::info!(repo = %request.repo, commit = %commit, "working copy ready");

        slot.enter(PipelineStatus::RunningTests)?;
        let project_type = project::detect(&request.directory);
        slot.update(|run| run.project_type = Some(project_type));
        tracing::info!(repo = %request.repo, project_type = %project_type, "detected project type");

        let exit_code = inner
            .test_runner
            .run_tests(&inner.runtime, &request.repo, project_type, &request.directory, diag)
            .await?;
        if exit_code != 0 {
            return Err(PipelineError::TestFailure { exit_code });
        }

        slot.enter(PipelineStatus::BuildingImage)?;
        let image = inner.publisher.image_for(&request.repo, &commit);
        inner
            .publisher
            .build(&inner.runtime, &request.directory, &image)
            .await?;

        slot.enter(PipelineStatus::PushingImage)?;
        let pushed = match inner.publisher.push(&inner.runtime, &image).await {
            Ok(()) => true,
            Err(e) => {
                let error = PipelineError::from(e);
                tracing::warn!(image = %image, "push failed, image kept locally: {}", error);
                slot.record_failure(&error);
                false
            }
        };
        slot.update(|run| run.last_image_tag = Some(image.clone()));

        Ok(CiOutcome {
            image,
            commit,
            project_type,
            pushed,
        })
    }

    // =========================================================================
    // Deploy pipeline
    // =========================================================================

    /// Replace the running container with `image_tag`, then prune old images.
    pub async fn run_deploy(&self, image_tag: &str) -> Result<DeployReport, PipelineError> {
        let (slot, image) = self.claim_deploy(image_tag)?;
        self.execute_deploy(slot, image).await
    }

    pub fn trigger_deploy(&self, image_tag: &str) -> Trigger {
        match self.claim_deploy(image_tag) {
            Ok((slot, image)) => {
                let this = self.clone();
                tokio::spawn(async move {
                    let _ = this.execute_deploy(slot, image).await;
                });
                Trigger::accepted()
            }
            Err(e) => Trigger::rejected(&e),
        }
    }

    fn claim_deploy(&self, image_tag: &str) -> Result<(RunSlot, ImageRef), PipelineError> {
        let image = ImageRef::parse(image_tag)
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
        let slot = RunSlot::claim(&self.inner.record, PipelineStatus::Deploying, None)?;
        Ok((slot, image))
    }

    async fn execute_deploy(&self, slot: RunSlot, image: ImageRef) -> Result<DeployReport, PipelineError> {
        let mut diag = Diagnostics::default();
        let result = self.deploy_stages(&slot, &image, &mut diag).await;
        slot.finish(diag, result.as_ref().err());
        result
    }

    async fn deploy_stages(
        &self,
        slot: &RunSlot,
        image: &ImageRef,
        diag: &mut Diagnostics,
    ) -> Result<DeployReport, PipelineError> {
        let inner = &*self.inner;
        let tracked = slot.read(|run| run.deployed_container.clone());
        let observer = |stage: DeployStage| slot.enter(stage.into()).is_ok();

        let outcome = inner
            .deployer
            .deploy(&inner.runtime, image, tracked.as_ref(), &observer, diag)
            .await?;

        match outcome {
            DeployOutcome::Deployed {
                container,
                replaced,
            } => {
                slot.update(|run| {
                    run.deployed_container = Some(container.clone());
                    run.deployed_image = Some(image.clone());
                });

                let pruned = if slot.is_cancelled() {
                    0
                } else {
                    inner
                        .retention
                        .prune(&inner.runtime, &image.repository(), diag)
                        .await
                };

                Ok(DeployReport {
                    container,
                    replaced,
                    pruned,
                })
            }
            DeployOutcome::RolledBack { restored, cause } => {
                if let Some(restored) = restored {
                    slot.update(|run| run.deployed_container = Some(restored));
                }
                Err(PipelineError::Deploy(cause))
            }
        }
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stop every managed container. Returns how many were stopped.
    pub async fn shutdown(&self) -> Result<usize, PipelineError> {
        let slot = self.claim_shutdown()?;
        Ok(self.execute_shutdown(slot).await)
    }

    pub fn trigger_shutdown(&self) -> Trigger {
        match self.claim_shutdown() {
            Ok(slot) => {
                let this = self.clone();
                tokio::spawn(async move {
                    this.execute_shutdown(slot).await;
                });
                Trigger::accepted()
            }
            Err(e) => Trigger::rejected(&e),
        }
    }

    fn claim_shutdown(&self) -> Result<RunSlot, PipelineError> {
        RunSlot::claim(&self.inner.record, PipelineStatus::ShuttingDown, None)
    }

    async fn execute_shutdown(&self, slot: RunSlot) -> usize {
        let mut diag = Diagnostics::default();
        let timeout: Duration = self.inner.deployer.settings().stop_timeout;
        let stopped = retention::stop_all(&self.inner.runtime, timeout, &mut diag).await;
        tracing::info!(stopped, "managed containers stopped");
        slot.finish(diag, None);
        stopped
    }
}
