//! Git operations for release workflows.
//!
//! [`GitOperations`] is the seam the pipelines depend on; [`SystemGit`]
//! implements it by shelling out to `git`.

mod operations;
mod system_git;

pub use operations::{CommitInfo, GitOperations, PushInfo};
pub use system_git::{SystemGit, parse_porcelain};
