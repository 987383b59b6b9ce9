//! Command line argument parsing and validation.
//!
//! Every task is a zero-argument subcommand; the only runtime flag is the
//! commit message consumed by the git steps.

use crate::pipeline::PipelineKind;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Build, test, version, publish and commit a dual-format Node.js package
#[derive(Parser, Debug)]
#[command(
    name = "node_release_base",
    version,
    about = "Build, test, version, publish and commit a dual-format Node.js package",
    long_about = "Runs the shared release pipelines for a TypeScript package that ships both
CommonJS and ES-module output. Run it from the package root.

Usage:
  node_release_base                    # clean, compile, copy, transform, test
  node_release_base test
  node_release_base patch -m \"fix: handle empty input\"
  node_release_base clean"
)]
pub struct Args {
    /// Task to run (defaults to the build)
    #[command(subcommand)]
    pub task: Option<Task>,

    /// Commit message for the git steps of a release
    #[arg(short = 'm', long = "message", value_name = "MESSAGE", global = true)]
    pub message: Option<String>,
}

/// Invocable tasks
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Clean, compile both targets, copy assets, transform and test
    #[command(alias = "default")]
    Build,
    /// Build, bump the patch version, publish, commit and push
    Patch,
    /// Build, bump the minor version, publish, commit and push
    Minor,
    /// Build, bump the major version, publish, commit and push
    Major,
    /// Compile both targets and run the tests
    Test,
    /// Remove the build and publish directories
    Clean,
    /// Install dependencies
    Install,
    /// Update dependencies within their semver ranges
    Update,
    /// List dependencies with newer releases
    Ncu,
    /// Upgrade dependency ranges in package.json
    #[command(name = "ncuu")]
    NcuUpgrade,
}

impl Task {
    /// Pipeline this task runs
    pub fn kind(self) -> PipelineKind {
        match self {
            Task::Build => PipelineKind::Build,
            Task::Patch => PipelineKind::Patch,
            Task::Minor => PipelineKind::Minor,
            Task::Major => PipelineKind::Major,
            Task::Test => PipelineKind::Test,
            Task::Clean => PipelineKind::Clean,
            Task::Install => PipelineKind::Install,
            Task::Update => PipelineKind::Update,
            Task::Ncu => PipelineKind::Ncu,
            Task::NcuUpgrade => PipelineKind::NcuUpgrade,
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Requested task, defaulting to the build
    pub fn task(&self) -> Task {
        self.task.unwrap_or(Task::Build)
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if let Some(message) = &self.message
            && message.trim().is_empty()
        {
            return Err("Commit message must not be empty".to_string());
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    project_root: PathBuf,
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Runtime configuration for a project root
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            output: super::OutputManager::new(),
        }
    }

    /// Directory the pipelines operate on
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print error message
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}
