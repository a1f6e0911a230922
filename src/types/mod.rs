// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod commit_sha;
mod id;
mod image_ref;
mod repo_name;

pub use commit_sha::{CommitSha, CommitShaError};
pub use id::{ContainerId, ImageId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use repo_name::{RepoName, RepoNameError};
