// ABOUTME: Error type for containerized test runs.
// ABOUTME: Separates setup, build, run and timeout failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::project::ProjectType;
use crate::runtime::traits::{ContainerError, ImageError};

#[derive(Debug, Error)]
pub enum TestRunError {
    #[error("no test template for project type {0}")]
    UnsupportedProject(ProjectType),

    #[error("test template not found: {0}")]
    TemplateMissing(PathBuf),

    #[error("failed to swap Dockerfile at {path}: {source}")]
    Dockerfile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to pack build context: {0}")]
    Context(#[source] std::io::Error),

    #[error("test image build failed: {0}")]
    Build(#[source] ImageError),

    #[error("test container failed: {0}")]
    Run(#[source] ContainerError),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}
