// ABOUTME: Pipeline status values reported to pollers.
// ABOUTME: Serialized as SCREAMING_SNAKE_CASE strings.

use serde::Serialize;
use std::fmt;

use crate::deploy::DeployStage;

/// What the orchestrator is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    #[default]
    Idle,
    Triggered,
    PullingCode,
    RunningTests,
    BuildingImage,
    PushingImage,
    Deploying,
    PullingImage,
    StoppingContainer,
    CleaningUp,
    ShuttingDown,
}

impl PipelineStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, PipelineStatus::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Idle => "IDLE",
            PipelineStatus::Triggered => "TRIGGERED",
            PipelineStatus::PullingCode => "PULLING_CODE",
            PipelineStatus::RunningTests => "RUNNING_TESTS",
            PipelineStatus::BuildingImage => "BUILDING_IMAGE",
            PipelineStatus::PushingImage => "PUSHING_IMAGE",
            PipelineStatus::Deploying => "DEPLOYING",
            PipelineStatus::PullingImage => "PULLING_IMAGE",
            PipelineStatus::StoppingContainer => "STOPPING_CONTAINER",
            PipelineStatus::CleaningUp => "CLEANING_UP",
            PipelineStatus::ShuttingDown => "SHUTTING_DOWN",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DeployStage> for PipelineStatus {
    fn from(stage: DeployStage) -> Self {
        match stage {
            DeployStage::PullingImage => PipelineStatus::PullingImage,
            DeployStage::StoppingOld => PipelineStatus::StoppingContainer,
            DeployStage::StartingNew => PipelineStatus::Deploying,
            DeployStage::CleaningUp => PipelineStatus::CleaningUp,
        }
    }
}
