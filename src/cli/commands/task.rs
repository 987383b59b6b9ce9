//! Runs one task's pipeline against the project in the working directory.

use crate::cli::RuntimeConfig;
use crate::config::ProjectConfig;
use crate::error::Result;
use crate::git::SystemGit;
use crate::pipeline::{
    Pipeline, PipelineKind, PipelineReport, PipelineRunner, StepRegistry, StepStatus,
    WorkspaceExecutor,
};
use crate::process::SystemCommandRunner;
use crate::release::ReleaseSpec;

/// Result of a finished task
#[derive(Debug)]
pub struct TaskSummary {
    /// Step-by-step record
    pub report: PipelineReport,
    /// Package name after the run
    pub package: Option<String>,
    /// Package version after the run
    pub version: Option<String>,
}

/// Load configuration and package metadata, then run the task's pipeline
pub async fn execute_task(
    kind: PipelineKind,
    message: Option<String>,
    config: &RuntimeConfig,
) -> Result<TaskSummary> {
    let root = config.project_root();
    let project = ProjectConfig::load(root)?;
    let registry = StepRegistry::standard(&project);
    let pipeline = Pipeline::for_kind(kind, &registry)?;

    let runner = SystemCommandRunner;
    let git = SystemGit::new(runner, root);
    let spec = ReleaseSpec::resolve(root, &project, &git, message).await?;
    log::debug!(
        "Running '{}' for {} on branch '{}'",
        pipeline.name(),
        spec.package.name().unwrap_or("<unnamed>"),
        spec.main_branch
    );

    let executor = WorkspaceExecutor::new(root, &project, runner, git);
    let mut pipeline_runner = PipelineRunner::new(spec, executor);
    let report = pipeline_runner.run(&pipeline).await?;
    let (spec, _) = pipeline_runner.into_parts();

    Ok(TaskSummary {
        report,
        package: spec.package.name().map(str::to_string),
        version: spec.package.version().map(str::to_string),
    })
}

/// Print every step with its status, then the package version
pub fn print_summary(summary: &TaskSummary, config: &RuntimeConfig) {
    let output = config.output();
    let _ = output.section(&format!("Task '{}'", summary.report.pipeline));
    for step in &summary.report.steps {
        let line = match &step.detail {
            Some(detail) => format!("{} ({})", step.id, detail),
            None => step.id.clone(),
        };
        match step.status {
            StepStatus::Success => {
                let _ = output.success(&line);
            }
            StepStatus::Skipped => {
                let _ = output.skipped(&format!("{} (skipped)", step.id));
            }
        }
    }
    if let (Some(name), Some(version)) = (&summary.package, &summary.version) {
        config.indent(&format!("{}@{}", name, version));
    }
    config.success_println(&format!(
        "Task '{}' finished in {} ms",
        summary.report.pipeline,
        summary.report.elapsed().as_millis()
    ));
}
