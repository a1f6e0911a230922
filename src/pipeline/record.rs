// ABOUTME: The orchestrator's run record and the snapshots derived from it.
// ABOUTME: Details and LastDeployment are what pollers read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use super::error::{PipelineError, PipelineErrorKind};
use super::status::PipelineStatus;
use crate::diagnostics::Warning;
use crate::project::ProjectType;
use crate::types::{ContainerId, ImageRef, RepoName};

/// Repository a CI run works on. Set as a unit when the run is accepted.
#[derive(Debug, Clone)]
pub(crate) struct RepoBinding {
    pub name: RepoName,
    pub url: String,
    pub directory: PathBuf,
}

/// A failure recorded by the most recent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedFailure {
    pub kind: PipelineErrorKind,
    /// Status the run was in when it failed.
    pub stage: PipelineStatus,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub(crate) struct PipelineRun {
    pub status: PipelineStatus,
    pub repo: Option<RepoBinding>,
    pub project_type: Option<ProjectType>,
    pub last_image_tag: Option<ImageRef>,
    pub deployed_container: Option<ContainerId>,
    pub deployed_image: Option<ImageRef>,
    pub last_error: Option<RecordedFailure>,
    pub warnings: Vec<Warning>,
    pub cancel_requested: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Reset per-run fields for a newly accepted run.
    pub fn begin(&mut self, status: PipelineStatus, repo: Option<RepoBinding>) {
        self.status = status;
        self.repo = repo;
        self.project_type = None;
        self.last_error = None;
        self.warnings.clear();
        self.cancel_requested = false;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
    }

    pub fn record_failure(&mut self, error: &PipelineError) {
        self.last_error = Some(RecordedFailure {
            kind: error.kind(),
            stage: self.status,
            message: error.to_string(),
            at: Utc::now(),
        });
    }
}

/// Snapshot of the current or most recent run.
#[derive(Debug, Clone, Serialize)]
pub struct Details {
    pub status: PipelineStatus,
    pub repo_name: Option<String>,
    pub repo_directory: Option<PathBuf>,
    pub repo_url: Option<String>,
    pub project_type: Option<ProjectType>,
    pub pipeline_dir: PathBuf,
    pub deployments: PathBuf,
    pub last_error: Option<RecordedFailure>,
    pub warnings: Vec<Warning>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Details {
    pub(crate) fn capture(run: &PipelineRun, pipeline_dir: PathBuf, deployments: PathBuf) -> Self {
        let repo = run.repo.as_ref();
        Self {
            status: run.status,
            repo_name: repo.map(|r| r.name.to_string()),
            repo_directory: repo.map(|r| r.directory.clone()),
            repo_url: repo.map(|r| r.url.clone()),
            project_type: run.project_type,
            pipeline_dir,
            deployments,
            last_error: run.last_error.clone(),
            warnings: run.warnings.clone(),
            started_at: run.started_at,
            finished_at: run.finished_at,
        }
    }
}

/// What was last published and what is serving now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastDeployment {
    /// Tag (short commit hash) of the last published image.
    pub last_tag_number: Option<String>,
    /// Full reference of the last published image.
    pub last_image: Option<String>,
    pub deployed_container_id: Option<String>,
    pub deployed_image: Option<String>,
}

impl LastDeployment {
    pub(crate) fn capture(run: &PipelineRun) -> Self {
        Self {
            last_tag_number: run
                .last_image_tag
                .as_ref()
                .and_then(|i| i.tag())
                .map(str::to_string),
            last_image: run.last_image_tag.as_ref().map(|i| i.to_string()),
            deployed_container_id: run.deployed_container.as_ref().map(|c| c.to_string()),
            deployed_image: run.deployed_image.as_ref().map(|i| i.to_string()),
        }
    }
}

/// Acknowledgment returned by the fire-and-forget triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trigger {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Trigger {
    pub(crate) fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub(crate) fn rejected(error: &PipelineError) -> Self {
        Self {
            accepted: false,
            reason: Some(error.to_string()),
        }
    }
}
