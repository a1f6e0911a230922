// ABOUTME: Diagnostics accumulator for best-effort cleanup failures.
// ABOUTME: Collects warnings that never fail a pipeline but are surfaced in its details.

use serde::Serialize;

/// Collects non-fatal warnings during a pipeline run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A cleanup step that failed without affecting the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn container_stop(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ContainerStop,
            message: message.into(),
        }
    }

    pub fn container_removal(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ContainerRemoval,
            message: message.into(),
        }
    }

    pub fn image_removal(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ImageRemoval,
            message: message.into(),
        }
    }

    pub fn image_prune(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ImagePrune,
            message: message.into(),
        }
    }

    pub fn dockerfile_restore(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DockerfileRestore,
            message: message.into(),
        }
    }

    pub fn image_pull(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ImagePull,
            message: message.into(),
        }
    }

    pub fn cleanup_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::CleanupSkipped,
            message: message.into(),
        }
    }
}

/// Categories of cleanup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    /// A container could not be stopped.
    ContainerStop,
    /// A stopped container could not be removed.
    ContainerRemoval,
    /// A test image could not be removed.
    ImageRemoval,
    /// Retention could not list or remove an old image.
    ImagePrune,
    /// The working copy's own Dockerfile could not be put back.
    DockerfileRestore,
    /// The registry pull failed and a local copy of the image was used.
    ImagePull,
    /// Cleanup was skipped because the run was cancelled.
    CleanupSkipped,
}
