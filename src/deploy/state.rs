// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: States that own a new container carry its ID.

use crate::types::ContainerId;

/// Initial state: target image known, previous container identified.
/// Available actions: `pull_image()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Image pulled: image available locally.
/// Available actions: `stop_old()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePulled;

/// Previous container stopped (or there was none).
/// Available actions: `start_new()`, `rollback()`
#[derive(Debug, Clone, Copy, Default)]
pub struct OldStopped {
    pub(crate) stopped_running: bool,
}

/// New container running.
/// Available actions: `cleanup()`
#[derive(Debug, Clone)]
pub struct Started {
    pub(crate) container_id: ContainerId,
}

/// Completed: new container serving, old container removed.
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) container_id: ContainerId,
}
