// ABOUTME: Guard for the single pipeline slot.
// ABOUTME: Claiming rejects concurrent runs; dropping always returns the status to Idle.

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;

use super::error::PipelineError;
use super::record::{PipelineRun, RepoBinding};
use super::status::PipelineStatus;
use crate::diagnostics::Diagnostics;

/// Exclusive right to drive the run record for one pipeline run.
///
/// Every access takes the lock for a single synchronous step, so the guard
/// can be held across `.await` points.
#[derive(Debug)]
pub(crate) struct RunSlot {
    record: Arc<RwLock<PipelineRun>>,
}

impl RunSlot {
    /// Accept a new run in `status`, or reject it if one is in flight.
    pub fn claim(
        record: &Arc<RwLock<PipelineRun>>,
        status: PipelineStatus,
        repo: Option<RepoBinding>,
    ) -> Result<Self, PipelineError> {
        let mut run = record.write();
        if !run.status.is_idle() {
            return Err(PipelineError::Busy(run.status));
        }
        run.begin(status, repo);
        tracing::info!(status = %status, "pipeline accepted");

        Ok(Self {
            record: Arc::clone(record),
        })
    }

    /// Move to `status` unless cancellation was requested.
    pub fn enter(&self, status: PipelineStatus) -> Result<(), PipelineError> {
        let mut run = self.record.write();
        if run.cancel_requested {
            return Err(PipelineError::Cancelled);
        }
        tracing::info!(from = %run.status, to = %status, "pipeline stage");
        run.status = status;
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.record.read().cancel_requested
    }

    pub fn read<T>(&self, f: impl FnOnce(&PipelineRun) -> T) -> T {
        f(&self.record.read())
    }

    pub fn update(&self, f: impl FnOnce(&mut PipelineRun)) {
        f(&mut self.record.write());
    }

    pub fn record_failure(&self, error: &PipelineError) {
        self.record.write().record_failure(error);
    }

    /// Close the run, storing its warnings and, if it failed, the failure.
    pub fn finish(self, diag: Diagnostics, failure: Option<&PipelineError>) {
        let mut run = self.record.write();
        if let Some(error) = failure {
            tracing::error!(stage = %run.status, kind = ?error.kind(), "pipeline aborted: {}", error);
            run.record_failure(error);
        } else {
            tracing::info!("pipeline finished");
        }
        run.warnings = diag.into_warnings();
    }
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        let mut run = self.record.write();
        run.status = PipelineStatus::Idle;
        run.cancel_requested = false;
        run.finished_at = Some(Utc::now());
    }
}
