//! # node_release_base
//!
//! Shared build and release pipelines for TypeScript packages that ship both
//! CommonJS and ES-module output.
//!
//! ## Features
//!
//! - **Dual targets**: every compile, copy, transform and test step runs once
//!   per module format, each variant guarded by its own flag
//! - **Fail-fast pipelines**: steps run strictly in order and the first
//!   failure stops the run with the failing step's id
//! - **Release flow**: test, bump, publish, then commit and push, with settle
//!   delays after staging and after publishing
//! - **Idempotent re-runs**: clean and copy steps converge on the same tree
//!
//! ## Usage
//!
//! ```bash
//! node_release_base                       # build both targets and test
//! node_release_base patch -m "fix: typo"  # build, bump, publish, commit, push
//! node_release_base clean
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod error;
pub mod files;
pub mod git;
pub mod metadata;
pub mod pipeline;
pub mod process;
pub mod release;
pub mod version;

pub use config::ProjectConfig;
pub use error::{ReleaseError, Result};
pub use git::{GitOperations, SystemGit};
pub use metadata::PackageMetadata;
pub use pipeline::{
    ModuleTarget, Pipeline, PipelineKind, PipelineReport, PipelineRunner, StepExecutor,
    StepRegistry, WorkspaceExecutor,
};
pub use process::{CommandRunner, SystemCommandRunner};
pub use release::{DualTargets, ReleaseSpec, SettleTimeouts};
pub use version::{BumpKind, bump_version};
