//! Git backend driving the system `git` binary through a [`CommandRunner`].

use crate::error::{GitError, Result};
use crate::git::{CommitInfo, GitOperations, PushInfo};
use crate::process::{CommandRunner, ExternalCommand, log_output};
use std::path::{Path, PathBuf};

/// Git operations for one working tree
#[derive(Debug, Clone)]
pub struct SystemGit<R> {
    runner: R,
    work_dir: PathBuf,
}

impl<R: CommandRunner> SystemGit<R> {
    /// Operate on the working tree at `work_dir`
    pub fn new(runner: R, work_dir: &Path) -> Self {
        Self {
            runner,
            work_dir: work_dir.to_path_buf(),
        }
    }

    fn git(&self) -> ExternalCommand {
        ExternalCommand::new("git", &self.work_dir)
    }
}

impl<R: CommandRunner> GitOperations for SystemGit<R> {
    async fn current_branch(&self) -> Result<Option<String>> {
        let output = self
            .runner
            .run(&self.git().args(["rev-parse", "--abbrev-ref", "HEAD"]))
            .await?;
        if !output.success() {
            if output.stderr.contains("not a git repository") {
                return Err(GitError::NotRepository.into());
            }
            return Ok(None);
        }
        let branch = output.stdout.trim();
        if branch.is_empty() || branch == "HEAD" {
            return Ok(None);
        }
        Ok(Some(branch.to_string()))
    }

    async fn changed_paths(&self) -> Result<Vec<String>> {
        let output = self
            .runner
            .run(&self.git().args(["status", "--porcelain", "-z", "--untracked-files=all"]))
            .await?;
        if !output.success() {
            if output.stderr.contains("not a git repository") {
                return Err(GitError::NotRepository.into());
            }
            return Err(GitError::StageFailed {
                reason: output.combined(),
            }
            .into());
        }
        Ok(parse_porcelain(&output.stdout))
    }

    async fn stage(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let command = self.git().args(["add", "--all", "--"]).args(paths.iter().cloned());
        let output = self.runner.run(&command).await?;
        if !output.success() {
            return Err(GitError::StageFailed {
                reason: output.combined(),
            }
            .into());
        }
        log_output(&output);
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<CommitInfo> {
        let output = self.runner.run(&self.git().args(["commit", "-m", message])).await?;
        if !output.success() {
            return Err(GitError::CommitFailed {
                reason: output.combined(),
            }
            .into());
        }
        log_output(&output);
        Ok(CommitInfo {
            short_hash: parse_commit_hash(&output.stdout),
            message: message.to_string(),
        })
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<PushInfo> {
        let output = self.runner.run(&self.git().args(["push", remote, branch])).await?;
        if !output.success() {
            return Err(GitError::PushFailed {
                remote: remote.to_string(),
                branch: branch.to_string(),
                reason: output.combined(),
            }
            .into());
        }
        // git reports push progress on stderr
        log_output(&output);
        Ok(PushInfo {
            remote: remote.to_string(),
            branch: branch.to_string(),
        })
    }
}

/// Paths from `git status --porcelain -z` output.
///
/// Records are NUL-terminated and never quoted. A rename or copy record
/// carries its source path as an extra field; only the new path is kept.
pub fn parse_porcelain(stdout: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut fields = stdout.split('\0');
    while let Some(record) = fields.next() {
        let Some(path) = record.get(3..).filter(|p| !p.is_empty()) else {
            continue;
        };
        if matches!(record.as_bytes()[0], b'R' | b'C') {
            fields.next();
        }
        paths.push(path.to_string());
    }
    paths
}

/// Short hash from `git commit` output such as `[main 1a2b3c4] message`
fn parse_commit_hash(stdout: &str) -> Option<String> {
    let header = stdout.lines().next()?.strip_prefix('[')?;
    let (inside, _) = header.split_once(']')?;
    inside.split_whitespace().last().map(str::to_string)
}
