// ABOUTME: Container redeployment using the type state pattern.
// ABOUTME: Exports state markers, the Deployment struct and the manager that drives it.

mod deployment;
mod error;
mod manager;
mod rollback;
mod state;
mod transitions;

pub use deployment::{DeploySettings, Deployment};
pub use error::{DeployError, DeployErrorKind};
pub use manager::{DeployOutcome, DeployStage, DeploymentManager, StageObserver};
pub use rollback::{restart_previous, stop_and_remove};
pub use state::{Completed, ImagePulled, Initialized, OldStopped, Started};
pub use transitions::TransitionResult;
