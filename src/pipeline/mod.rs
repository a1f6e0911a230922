// ABOUTME: The pipeline engine: CI, deploy and shutdown runs over a shared run record.
// ABOUTME: Exposes the orchestrator handle and the snapshots pollers read.

mod error;
mod orchestrator;
mod record;
mod slot;
mod status;

pub use error::{PipelineError, PipelineErrorKind};
pub use orchestrator::{CiOutcome, DeployReport, Orchestrator};
pub use record::{Details, LastDeployment, RecordedFailure, Trigger};
pub use status::PipelineStatus;
