//! Git operations trait and result types used by the release pipelines.

use crate::error::Result;
use std::future::Future;

/// The git operations the pipelines need
pub trait GitOperations {
    /// Name of the checked-out branch; `None` when detached or undetectable
    fn current_branch(&self) -> impl Future<Output = Result<Option<String>>>;

    /// Changed and untracked paths, as reported by `git status`
    fn changed_paths(&self) -> impl Future<Output = Result<Vec<String>>>;

    /// Stage the given paths
    fn stage(&self, paths: &[String]) -> impl Future<Output = Result<()>>;

    /// Commit whatever is staged
    fn commit(&self, message: &str) -> impl Future<Output = Result<CommitInfo>>;

    /// Push `branch` to `remote`
    fn push(&self, remote: &str, branch: &str) -> impl Future<Output = Result<PushInfo>>;
}

/// Information about a created commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Short commit hash, when git reported one
    pub short_hash: Option<String>,
    /// Commit message
    pub message: String,
}

/// Information about a push operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushInfo {
    /// Remote name that was pushed to
    pub remote: String,
    /// Branch that was pushed
    pub branch: String,
}
