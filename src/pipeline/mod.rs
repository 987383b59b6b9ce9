//! Release pipelines.
//!
//! A [`StepRegistry`] maps step names to typed operations, a [`Pipeline`]
//! is an ordered list resolved from those names, and a [`PipelineRunner`]
//! executes it one step at a time through a [`StepExecutor`].
//!
//! Steps that exist once per module format (compile, copy, test, ...) are
//! registered as dual steps and expand into `<name>.commonjs` and
//! `<name>.esmodule`, each guarded by its target flag.

mod definition;
mod executor;
mod registry;
mod runner;
mod step;

pub use definition::{Pipeline, PipelineKind};
pub use executor::WorkspaceExecutor;
pub use registry::{StepDefinition, StepRegistry};
pub use runner::{
    PipelineReport, PipelineRunner, StepExecutor, StepOutcome, StepResult, StepStatus,
};
pub use step::{
    ModuleTarget, NpmTask, PipelineStep, StepCategory, StepCondition, StepOperation, VcsOperation,
};
